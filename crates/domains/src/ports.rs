//! # Ports
//!
//! Any adapter must implement these traits to be wired into the services.
//! Simple ports get `MockXxx` doubles under the `testing` feature; the
//! resource stores are generic and are exercised against the in-memory
//! adapters instead.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::error::DomainResult;
use crate::lifecycle::Scope;
use crate::models::{
    Category, CategoryFields, CategoryId, NewReply, NewThread, NewUser, Page, Profile,
    ProfileChanges, Reply, ReplyId, Resource, Thread, ThreadFields, ThreadId, ThreadQuery, User,
    UserId,
};
use crate::permissions::{Actor, Permission};

// ── Authorization ────────────────────────────────────────────────────────────

/// Answers allow/deny for an actor and a named permission.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PermissionOracle: Send + Sync {
    async fn can(&self, actor: &Actor, permission: &Permission) -> DomainResult<bool>;
}

/// Role administration backing the oracle.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Creates the role if it does not exist yet.
    async fn ensure_role(&self, role: &str) -> DomainResult<()>;
    async fn role_exists(&self, role: &str) -> DomainResult<bool>;
    async fn grant(&self, role: &str, permission: &Permission) -> DomainResult<()>;
    async fn assign_role(&self, user: UserId, role: &str) -> DomainResult<()>;
    async fn roles_of(&self, user: UserId) -> DomainResult<Vec<String>>;
}

// ── Resource stores ──────────────────────────────────────────────────────────

/// Lifecycle primitives shared by every content store.
///
/// `soft_delete`, `restore` and `hard_delete` report whether a row was
/// affected; a `false` means a concurrent request got there first.
#[async_trait]
pub trait ResourceStore<R: Resource>: Send + Sync {
    async fn find(&self, id: R::Id, scope: Scope) -> DomainResult<Option<R>>;
    async fn soft_delete(&self, id: R::Id, at: DateTime<Utc>) -> DomainResult<bool>;
    async fn restore(&self, id: R::Id) -> DomainResult<bool>;
    async fn hard_delete(&self, id: R::Id) -> DomainResult<bool>;
}

#[async_trait]
pub trait CategoryRepository: ResourceStore<Category> {
    async fn insert(&self, fields: CategoryFields) -> DomainResult<Category>;
    async fn update(&self, id: CategoryId, fields: CategoryFields) -> DomainResult<Category>;
    async fn find_by_slug(&self, slug: &str, scope: Scope) -> DomainResult<Option<Category>>;
    /// Active categories, most recent first.
    async fn list(&self) -> DomainResult<Vec<Category>>;
}

#[async_trait]
pub trait ThreadRepository: ResourceStore<Thread> {
    async fn insert(&self, thread: NewThread) -> DomainResult<Thread>;
    async fn update(&self, id: ThreadId, fields: ThreadFields) -> DomainResult<Thread>;
    async fn find_by_slug(&self, slug: &str, scope: Scope) -> DomainResult<Option<Thread>>;
    /// Active threads matching the query, one page of them.
    async fn list(&self, query: &ThreadQuery) -> DomainResult<Page<Thread>>;
}

#[async_trait]
pub trait ReplyRepository: ResourceStore<Reply> {
    async fn insert(&self, reply: NewReply) -> DomainResult<Reply>;
    async fn update(&self, id: ReplyId, body: String) -> DomainResult<Reply>;
    /// Active replies of a thread, oldest first.
    async fn list_for_thread(&self, thread: ThreadId) -> DomainResult<Vec<Reply>>;
}

// ── Accounts ─────────────────────────────────────────────────────────────────

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts the user and an empty profile atomically.
    async fn create(&self, user: NewUser) -> DomainResult<User>;
    async fn find_by_id(&self, id: UserId) -> DomainResult<Option<User>>;
    async fn find_by_username(&self, username: &str) -> DomainResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>>;
    async fn update_password(&self, id: UserId, password_hash: &str) -> DomainResult<()>;
    async fn mark_email_verified(&self, id: UserId, at: DateTime<Utc>) -> DomainResult<()>;
    async fn profile(&self, id: UserId) -> DomainResult<Profile>;
    async fn update_profile(&self, id: UserId, changes: ProfileChanges) -> DomainResult<Profile>;
    async fn list_profiles(&self) -> DomainResult<Vec<Profile>>;
}

/// One outstanding reset token per email address, stored hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordResetRecord {
    pub email: String,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PasswordResetRepository: Send + Sync {
    /// Replaces any previous token for the same email.
    async fn put(&self, record: PasswordResetRecord) -> DomainResult<()>;
    async fn find(&self, email: &str) -> DomainResult<Option<PasswordResetRecord>>;
    async fn delete(&self, email: &str) -> DomainResult<()>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plain: &str) -> DomainResult<String>;
    fn verify(&self, plain: &str, hash: &str) -> bool;
}

/// An issued session credential. `max_age` is set for "remember me" sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub token: String,
    pub max_age: Option<Duration>,
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait SessionTokens: Send + Sync {
    fn issue(&self, user: UserId, remember: bool) -> DomainResult<SessionToken>;
    /// `None` for malformed, tampered, or expired tokens.
    fn verify(&self, token: &str) -> Option<UserId>;
}

/// Path plus expiry and signature query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUrl {
    pub path: String,
    pub expires: i64,
    pub signature: String,
}

impl std::fmt::Display for SignedUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}?expires={}&signature={}",
            self.path, self.expires, self.signature
        )
    }
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait UrlSigner: Send + Sync {
    fn sign(&self, path: &str, expires_at: DateTime<Utc>) -> SignedUrl;
    /// Checks both the signature and that `expires` lies in the future.
    fn verify(&self, path: &str, expires: i64, signature: &str) -> bool;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait ResetTokens: Send + Sync {
    fn generate(&self) -> String;
    /// Stable one-way digest; only digests are persisted.
    fn digest(&self, token: &str) -> String;
}

// ── Notifications ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    VerifyEmail { url: String },
    ResetPassword { token: String },
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user: &User, notification: Notification) -> DomainResult<()>;
}

// ── Throttling ───────────────────────────────────────────────────────────────

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait LoginThrottle: Send + Sync {
    /// Time left before another attempt is allowed, if locked out.
    async fn too_many_attempts(&self, key: &str) -> Option<Duration>;
    async fn hit(&self, key: &str);
    async fn clear(&self, key: &str);
}
