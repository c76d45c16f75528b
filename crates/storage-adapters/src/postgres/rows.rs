//! Database row shapes and their conversion into domain models.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use domains::{
    Category, CategoryId, Lifecycle, PasswordResetRecord, Profile, Reply, ReplyId, Thread,
    ThreadId, User, UserId,
};

pub(super) const CATEGORY_COLUMNS: &str =
    "c.id, c.name, c.slug, c.description, c.created_at, c.updated_at, c.deleted_at";

pub(super) const THREAD_COLUMNS: &str = "t.id, t.owner_id, t.category_id, t.title, t.slug, t.body, \
     t.created_at, t.updated_at, t.deleted_at, \
     (SELECT COUNT(*) FROM replies rc WHERE rc.thread_id = t.id AND rc.deleted_at IS NULL) AS replies_count";

pub(super) const REPLY_COLUMNS: &str =
    "r.id, r.owner_id, r.thread_id, r.body, r.created_at, r.updated_at, r.deleted_at";

pub(super) const USER_COLUMNS: &str =
    "id, username, email, password_hash, email_verified_at, created_at, updated_at";

pub(super) const PROFILE_COLUMNS: &str = "user_id, preferred_name, first_name, last_name, bio";

#[derive(Debug, FromRow)]
pub(super) struct CategoryRow {
    id: i64,
    name: String,
    slug: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: CategoryId(row.id),
            name: row.name,
            slug: row.slug,
            description: row.description,
            lifecycle: Lifecycle::from_deleted_at(row.deleted_at),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(super) struct ThreadRow {
    id: i64,
    owner_id: i64,
    category_id: i64,
    title: String,
    slug: String,
    body: String,
    replies_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<ThreadRow> for Thread {
    fn from(row: ThreadRow) -> Self {
        Thread {
            id: ThreadId(row.id),
            owner_id: UserId(row.owner_id),
            category_id: CategoryId(row.category_id),
            title: row.title,
            slug: row.slug,
            body: row.body,
            replies_count: row.replies_count,
            lifecycle: Lifecycle::from_deleted_at(row.deleted_at),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(super) struct ReplyRow {
    id: i64,
    owner_id: i64,
    thread_id: i64,
    body: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<ReplyRow> for Reply {
    fn from(row: ReplyRow) -> Self {
        Reply {
            id: ReplyId(row.id),
            owner_id: UserId(row.owner_id),
            thread_id: ThreadId(row.thread_id),
            body: row.body,
            lifecycle: Lifecycle::from_deleted_at(row.deleted_at),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(super) struct UserRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    email_verified_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: UserId(row.id),
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            email_verified_at: row.email_verified_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(super) struct ProfileRow {
    user_id: i64,
    preferred_name: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    bio: Option<String>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Profile {
            user_id: UserId(row.user_id),
            preferred_name: row.preferred_name,
            first_name: row.first_name,
            last_name: row.last_name,
            bio: row.bio,
        }
    }
}

#[derive(Debug, FromRow)]
pub(super) struct ResetRow {
    email: String,
    token_hash: String,
    created_at: DateTime<Utc>,
}

impl From<ResetRow> for PasswordResetRecord {
    fn from(row: ResetRow) -> Self {
        PasswordResetRecord {
            email: row.email,
            token_hash: row.token_hash,
            created_at: row.created_at,
        }
    }
}
