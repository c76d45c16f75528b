//! # Domain Models
//!
//! These structs represent the core entities of the forum. Rows are keyed by
//! database-assigned integers wrapped in per-entity newtypes so a thread id
//! can never be passed where a reply id is expected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::lifecycle::Lifecycle;
use crate::permissions::ResourceKind;

macro_rules! id_type {
    ($($name:ident),* $(,)?) => {$(
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    )*};
}

id_type!(UserId, CategoryId, ThreadId, ReplyId);

/// A registered account. Looked up externally by `username`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn has_verified_email(&self) -> bool {
        self.email_verified_at.is_some()
    }

    pub fn path(&self) -> String {
        format!("/profiles/@{}", self.username)
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Owned exclusively by one user; created empty at registration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: UserId,
    pub preferred_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProfileChanges {
    pub preferred_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
}

/// Resolves the name shown next to a user's content.
///
/// Preferred name wins; then "first last" when both are present; then the
/// first name alone; otherwise the handle.
pub fn display_name(profile: &Profile, username: &str) -> String {
    fn present(field: &Option<String>) -> Option<&str> {
        field.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    if let Some(preferred) = present(&profile.preferred_name) {
        return preferred.to_string();
    }
    match (present(&profile.first_name), present(&profile.last_name)) {
        (Some(first), Some(last)) => format!("{first} {last}"),
        (Some(first), None) => first.to_string(),
        _ => format!("@{username}"),
    }
}

/// A user together with their profile and resolved display name.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    #[serde(flatten)]
    pub user: User,
    pub display_name: String,
    pub profile: Profile,
}

impl UserView {
    pub fn new(user: User, profile: Profile) -> Self {
        let display_name = display_name(&profile, &user.username);
        Self {
            user,
            display_name,
            profile,
        }
    }
}

/// Top-level, moderator-managed grouping of threads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    /// URL-safe key (e.g. "general")
    pub slug: String,
    pub description: Option<String>,
    pub lifecycle: Lifecycle,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn path(&self) -> String {
        format!("/community/categories/{}", self.slug)
    }
}

#[derive(Debug, Clone)]
pub struct CategoryFields {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: ThreadId,
    pub owner_id: UserId,
    pub category_id: CategoryId,
    pub title: String,
    /// Route key; unique across all threads.
    pub slug: String,
    pub body: String,
    /// Active replies only.
    pub replies_count: i64,
    pub lifecycle: Lifecycle,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Thread {
    pub fn path(&self, category_slug: &str) -> String {
        format!("/community/categories/{}/threads/{}", category_slug, self.slug)
    }
}

#[derive(Debug, Clone)]
pub struct ThreadFields {
    pub category_id: CategoryId,
    pub title: String,
    pub slug: String,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct NewThread {
    pub owner_id: UserId,
    pub fields: ThreadFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub id: ReplyId,
    pub owner_id: UserId,
    pub thread_id: ThreadId,
    pub body: String,
    pub lifecycle: Lifecycle,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reply {
    pub fn path(&self, category_slug: &str, thread_slug: &str) -> String {
        format!(
            "/community/categories/{}/threads/{}/replies/{}",
            category_slug, thread_slug, self.id
        )
    }
}

#[derive(Debug, Clone)]
pub struct NewReply {
    pub owner_id: UserId,
    pub thread_id: ThreadId,
    pub body: String,
}

/// A thread with its visible replies, oldest first.
#[derive(Debug, Clone, Serialize)]
pub struct ThreadDetail {
    #[serde(flatten)]
    pub thread: Thread,
    pub replies: Vec<Reply>,
}

/// Common shape of everything that goes through the lifecycle controller.
pub trait Resource: Clone + Send + Sync + 'static {
    type Id: Copy + fmt::Display + Send + Sync + 'static;

    const KIND: ResourceKind;

    fn id(&self) -> Self::Id;
    /// `None` for resources without authorship (categories).
    fn owner_id(&self) -> Option<UserId>;
    fn lifecycle(&self) -> Lifecycle;
    fn set_lifecycle(&mut self, lifecycle: Lifecycle);
}

impl Resource for Category {
    type Id = CategoryId;
    const KIND: ResourceKind = ResourceKind::Category;

    fn id(&self) -> CategoryId {
        self.id
    }

    fn owner_id(&self) -> Option<UserId> {
        None
    }

    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    fn set_lifecycle(&mut self, lifecycle: Lifecycle) {
        self.lifecycle = lifecycle;
    }
}

impl Resource for Thread {
    type Id = ThreadId;
    const KIND: ResourceKind = ResourceKind::Thread;

    fn id(&self) -> ThreadId {
        self.id
    }

    fn owner_id(&self) -> Option<UserId> {
        Some(self.owner_id)
    }

    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    fn set_lifecycle(&mut self, lifecycle: Lifecycle) {
        self.lifecycle = lifecycle;
    }
}

impl Resource for Reply {
    type Id = ReplyId;
    const KIND: ResourceKind = ResourceKind::Reply;

    fn id(&self) -> ReplyId {
        self.id
    }

    fn owner_id(&self) -> Option<UserId> {
        Some(self.owner_id)
    }

    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    fn set_lifecycle(&mut self, lifecycle: Lifecycle) {
        self.lifecycle = lifecycle;
    }
}

/// Fixed page size for thread listings.
pub const THREADS_PER_PAGE: u32 = 25;

/// Query assembled by the thread filter chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadQuery {
    pub category_id: Option<CategoryId>,
    pub owner_id: Option<UserId>,
    pub popular: bool,
    pub unanswered: bool,
    pub page: u32,
    pub per_page: u32,
}

impl Default for ThreadQuery {
    fn default() -> Self {
        Self {
            category_id: None,
            owner_id: None,
            popular: false,
            unanswered: false,
            page: 1,
            per_page: THREADS_PER_PAGE,
        }
    }
}

impl ThreadQuery {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub current_page: u32,
    pub per_page: u32,
    pub total: u64,
    pub last_page: u32,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, current_page: u32, per_page: u32, total: u64) -> Self {
        let per = u64::from(per_page.max(1));
        let last_page = total.div_ceil(per).max(1) as u32;
        Self {
            data,
            current_page,
            per_page,
            total,
            last_page,
        }
    }
}
