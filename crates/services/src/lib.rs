//! # Services
//!
//! Orchestration of the forum's use cases over the ports defined in
//! `domains`. Nothing in here knows about HTTP or SQL.

pub mod accounts;
pub mod categories;
pub mod lifecycle;
pub mod policy;
pub mod profiles;
pub mod replies;
pub mod roles;
pub mod threads;
mod validation;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use domains::{
    CategoryRepository, LoginThrottle, Notifier, PasswordHasher, PasswordResetRepository,
    PermissionOracle, ReplyRepository, ResetTokens, RoleStore, SessionTokens, ThreadRepository,
    UrlSigner, UserRepository,
};

pub use accounts::{
    AccountService, AccountSettings, Authenticated, ForgotPasswordInput, LoginInput,
    RegisterInput, ResetPasswordInput, VerificationStatus,
};
pub use categories::{CategoryInput, CategoryService};
pub use lifecycle::LifecycleController;
pub use policy::Policy;
pub use profiles::ProfileService;
pub use replies::{ReplyInput, ReplyService};
pub use roles::{AssignRoleInput, RoleService};
pub use threads::{IdField, ThreadFilter, ThreadInput, ThreadService};

/// A resource together with the path it is served under.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Located<T> {
    pub path: String,
    #[serde(flatten)]
    pub resource: T,
}

impl<T> Located<T> {
    pub fn new(path: String, resource: T) -> Self {
        Self { path, resource }
    }
}

/// An HTML checkbox (`"on"`, `"1"`) or a JSON boolean.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Checkbox {
    Bool(bool),
    Text(String),
}

impl Checkbox {
    pub fn is_checked(&self) -> bool {
        match self {
            Checkbox::Bool(b) => *b,
            Checkbox::Text(t) => matches!(t.trim(), "on" | "1" | "true" | "yes"),
        }
    }
}

/// Every adapter the services are wired against.
#[derive(Clone)]
pub struct Ports {
    pub users: Arc<dyn UserRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub threads: Arc<dyn ThreadRepository>,
    pub replies: Arc<dyn ReplyRepository>,
    pub password_resets: Arc<dyn PasswordResetRepository>,
    pub oracle: Arc<dyn PermissionOracle>,
    pub roles: Arc<dyn RoleStore>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub sessions: Arc<dyn SessionTokens>,
    pub signer: Arc<dyn UrlSigner>,
    pub reset_tokens: Arc<dyn ResetTokens>,
    pub notifier: Arc<dyn Notifier>,
    pub throttle: Arc<dyn LoginThrottle>,
}

/// Credential, delivery and throttling adapters.
#[derive(Clone)]
pub struct AuthPorts {
    pub hasher: Arc<dyn PasswordHasher>,
    pub sessions: Arc<dyn SessionTokens>,
    pub signer: Arc<dyn UrlSigner>,
    pub reset_tokens: Arc<dyn ResetTokens>,
    pub notifier: Arc<dyn Notifier>,
    pub throttle: Arc<dyn LoginThrottle>,
}

impl Ports {
    /// Wires every storage port to one store.
    pub fn from_store<S>(store: Arc<S>, auth: AuthPorts) -> Self
    where
        S: UserRepository
            + CategoryRepository
            + ThreadRepository
            + ReplyRepository
            + PasswordResetRepository
            + PermissionOracle
            + RoleStore
            + 'static,
    {
        Self {
            users: store.clone(),
            categories: store.clone(),
            threads: store.clone(),
            replies: store.clone(),
            password_resets: store.clone(),
            oracle: store.clone(),
            roles: store,
            hasher: auth.hasher,
            sessions: auth.sessions,
            signer: auth.signer,
            reset_tokens: auth.reset_tokens,
            notifier: auth.notifier,
            throttle: auth.throttle,
        }
    }
}

/// The full set of services, shared by the web layer and the seeder.
#[derive(Clone)]
pub struct ForumServices {
    pub categories: Arc<CategoryService>,
    pub threads: Arc<ThreadService>,
    pub replies: Arc<ReplyService>,
    pub profiles: Arc<ProfileService>,
    pub accounts: Arc<AccountService>,
    pub roles: Arc<RoleService>,
}

impl ForumServices {
    pub fn new(ports: Ports, settings: AccountSettings) -> Self {
        let policy = Policy::new(ports.oracle.clone());
        Self {
            categories: Arc::new(CategoryService::new(ports.categories.clone(), policy.clone())),
            threads: Arc::new(ThreadService::new(
                ports.threads.clone(),
                ports.categories.clone(),
                ports.replies.clone(),
                ports.users.clone(),
                policy.clone(),
            )),
            replies: Arc::new(ReplyService::new(
                ports.replies.clone(),
                ports.threads.clone(),
                ports.categories.clone(),
                policy.clone(),
            )),
            profiles: Arc::new(ProfileService::new(ports.users.clone())),
            roles: Arc::new(RoleService::new(ports.users.clone(), ports.roles.clone(), policy)),
            accounts: Arc::new(AccountService::new(&ports, settings)),
        }
    }
}
