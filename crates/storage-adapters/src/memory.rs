//! # In-memory adapters
//!
//! A single [`MemoryStore`] implements every repository port, the permission
//! oracle and the role store over plain maps behind one `RwLock`. Used by the
//! test harnesses and for running the server without a database.
//!
//! Behaves like the Postgres adapter where it matters: unique keys raise
//! `Conflict`, soft-deleted rows are only visible through the wider scopes,
//! and destroying a category or thread removes everything beneath it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::RwLock;

use domains::{
    Actor, Category, CategoryFields, CategoryId, CategoryRepository, DomainError, DomainResult,
    Lifecycle, NewReply, NewThread, NewUser, Page, PasswordResetRecord, PasswordResetRepository,
    Permission, PermissionOracle, Profile, ProfileChanges, Reply, ReplyId, ReplyRepository,
    ResourceStore, RoleStore, Scope, Thread, ThreadFields, ThreadId, ThreadQuery,
    ThreadRepository, User, UserId, UserRepository,
};

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<UserId, User>,
    profiles: BTreeMap<UserId, Profile>,
    categories: BTreeMap<CategoryId, Category>,
    threads: BTreeMap<ThreadId, Thread>,
    replies: BTreeMap<ReplyId, Reply>,
    resets: HashMap<String, PasswordResetRecord>,
    roles: BTreeMap<String, BTreeSet<Permission>>,
    user_roles: BTreeMap<UserId, Vec<String>>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn active_replies(&self, thread: ThreadId) -> i64 {
        self.replies
            .values()
            .filter(|r| r.thread_id == thread && r.lifecycle.is_active())
            .count() as i64
    }

    /// Threads carry their active reply count as seen at read time.
    fn thread_view(&self, thread: &Thread) -> Thread {
        Thread {
            replies_count: self.active_replies(thread.id),
            ..thread.clone()
        }
    }
}

fn cloned<T: Clone>(_: &Tables, row: &T) -> T {
    row.clone()
}

fn thread_view(tables: &Tables, thread: &Thread) -> Thread {
    tables.thread_view(thread)
}

fn no_cascade<I>(_: &mut Tables, _: I) {}

fn cascade_category(tables: &mut Tables, id: CategoryId) {
    let threads: Vec<ThreadId> = tables
        .threads
        .values()
        .filter(|t| t.category_id == id)
        .map(|t| t.id)
        .collect();
    for thread in threads {
        cascade_thread(tables, thread);
        tables.threads.remove(&thread);
    }
}

fn cascade_thread(tables: &mut Tables, id: ThreadId) {
    tables.replies.retain(|_, r| r.thread_id != id);
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

macro_rules! resource_store {
    ($resource:ty, $id:ty, $table:ident, $view:expr, $cascade:expr) => {
        #[async_trait]
        impl ResourceStore<$resource> for MemoryStore {
            async fn find(&self, id: $id, scope: Scope) -> DomainResult<Option<$resource>> {
                let tables = self.tables.read().await;
                Ok(tables
                    .$table
                    .get(&id)
                    .filter(|row| scope.admits(&row.lifecycle))
                    .map(|row| $view(&tables, row)))
            }

            async fn soft_delete(&self, id: $id, at: DateTime<Utc>) -> DomainResult<bool> {
                let mut tables = self.tables.write().await;
                match tables.$table.get_mut(&id) {
                    Some(row) if row.lifecycle.is_active() => {
                        row.lifecycle = Lifecycle::SoftDeleted { at };
                        Ok(true)
                    }
                    _ => Ok(false),
                }
            }

            async fn restore(&self, id: $id) -> DomainResult<bool> {
                let mut tables = self.tables.write().await;
                match tables.$table.get_mut(&id) {
                    Some(row) if row.lifecycle.is_soft_deleted() => {
                        row.lifecycle = Lifecycle::Active;
                        Ok(true)
                    }
                    _ => Ok(false),
                }
            }

            async fn hard_delete(&self, id: $id) -> DomainResult<bool> {
                let mut tables = self.tables.write().await;
                if tables.$table.remove(&id).is_none() {
                    return Ok(false);
                }
                $cascade(&mut tables, id);
                Ok(true)
            }
        }
    };
}

resource_store!(Category, CategoryId, categories, cloned, cascade_category);
resource_store!(Thread, ThreadId, threads, thread_view, cascade_thread);
resource_store!(Reply, ReplyId, replies, cloned, no_cascade);

// ── Categories ───────────────────────────────────────────────────────────────

#[async_trait]
impl CategoryRepository for MemoryStore {
    async fn insert(&self, fields: CategoryFields) -> DomainResult<Category> {
        let mut tables = self.tables.write().await;
        if tables.categories.values().any(|c| c.slug == fields.slug) {
            return Err(DomainError::Conflict("slug".into()));
        }
        let now = Utc::now();
        let category = Category {
            id: CategoryId(tables.next_id()),
            name: fields.name,
            slug: fields.slug,
            description: fields.description,
            lifecycle: Lifecycle::Active,
            created_at: now,
            updated_at: now,
        };
        tables.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update(&self, id: CategoryId, fields: CategoryFields) -> DomainResult<Category> {
        let mut tables = self.tables.write().await;
        if tables
            .categories
            .values()
            .any(|c| c.slug == fields.slug && c.id != id)
        {
            return Err(DomainError::Conflict("slug".into()));
        }
        let category = tables
            .categories
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("category", id))?;
        category.name = fields.name;
        category.slug = fields.slug;
        category.description = fields.description;
        category.updated_at = Utc::now();
        Ok(category.clone())
    }

    async fn find_by_slug(&self, slug: &str, scope: Scope) -> DomainResult<Option<Category>> {
        let tables = self.tables.read().await;
        Ok(tables
            .categories
            .values()
            .find(|c| c.slug == slug && scope.admits(&c.lifecycle))
            .cloned())
    }

    async fn list(&self) -> DomainResult<Vec<Category>> {
        let tables = self.tables.read().await;
        let mut categories: Vec<Category> = tables
            .categories
            .values()
            .filter(|c| c.lifecycle.is_active())
            .cloned()
            .collect();
        categories.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(categories)
    }
}

// ── Threads ──────────────────────────────────────────────────────────────────

#[async_trait]
impl ThreadRepository for MemoryStore {
    async fn insert(&self, thread: NewThread) -> DomainResult<Thread> {
        let mut tables = self.tables.write().await;
        if tables.threads.values().any(|t| t.slug == thread.fields.slug) {
            return Err(DomainError::Conflict("slug".into()));
        }
        if !tables.categories.contains_key(&thread.fields.category_id) {
            return Err(DomainError::not_found("category", thread.fields.category_id));
        }
        let now = Utc::now();
        let row = Thread {
            id: ThreadId(tables.next_id()),
            owner_id: thread.owner_id,
            category_id: thread.fields.category_id,
            title: thread.fields.title,
            slug: thread.fields.slug,
            body: thread.fields.body,
            replies_count: 0,
            lifecycle: Lifecycle::Active,
            created_at: now,
            updated_at: now,
        };
        tables.threads.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update(&self, id: ThreadId, fields: ThreadFields) -> DomainResult<Thread> {
        let mut tables = self.tables.write().await;
        if tables
            .threads
            .values()
            .any(|t| t.slug == fields.slug && t.id != id)
        {
            return Err(DomainError::Conflict("slug".into()));
        }
        let thread = tables
            .threads
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("thread", id))?;
        thread.category_id = fields.category_id;
        thread.title = fields.title;
        thread.slug = fields.slug;
        thread.body = fields.body;
        thread.updated_at = Utc::now();
        let thread = thread.clone();
        Ok(tables.thread_view(&thread))
    }

    async fn find_by_slug(&self, slug: &str, scope: Scope) -> DomainResult<Option<Thread>> {
        let tables = self.tables.read().await;
        Ok(tables
            .threads
            .values()
            .find(|t| t.slug == slug && scope.admits(&t.lifecycle))
            .map(|t| tables.thread_view(t)))
    }

    async fn list(&self, query: &ThreadQuery) -> DomainResult<Page<Thread>> {
        let tables = self.tables.read().await;
        let mut threads: Vec<Thread> = tables
            .threads
            .values()
            .filter(|t| t.lifecycle.is_active())
            .filter(|t| query.category_id.map_or(true, |c| t.category_id == c))
            .filter(|t| query.owner_id.map_or(true, |o| t.owner_id == o))
            .map(|t| tables.thread_view(t))
            .filter(|t| !query.unanswered || t.replies_count == 0)
            .collect();

        threads.sort_by(|a, b| {
            let recency = b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id));
            if query.popular {
                b.replies_count.cmp(&a.replies_count).then(recency)
            } else {
                recency
            }
        });

        let total = threads.len() as u64;
        let data = threads
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.per_page as usize)
            .collect();
        Ok(Page::new(data, query.page, query.per_page, total))
    }
}

// ── Replies ──────────────────────────────────────────────────────────────────

#[async_trait]
impl ReplyRepository for MemoryStore {
    async fn insert(&self, reply: NewReply) -> DomainResult<Reply> {
        let mut tables = self.tables.write().await;
        if !tables.threads.contains_key(&reply.thread_id) {
            return Err(DomainError::not_found("thread", reply.thread_id));
        }
        let now = Utc::now();
        let row = Reply {
            id: ReplyId(tables.next_id()),
            owner_id: reply.owner_id,
            thread_id: reply.thread_id,
            body: reply.body,
            lifecycle: Lifecycle::Active,
            created_at: now,
            updated_at: now,
        };
        tables.replies.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update(&self, id: ReplyId, body: String) -> DomainResult<Reply> {
        let mut tables = self.tables.write().await;
        let reply = tables
            .replies
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("reply", id))?;
        reply.body = body;
        reply.updated_at = Utc::now();
        Ok(reply.clone())
    }

    async fn list_for_thread(&self, thread: ThreadId) -> DomainResult<Vec<Reply>> {
        let tables = self.tables.read().await;
        let mut replies: Vec<Reply> = tables
            .replies
            .values()
            .filter(|r| r.thread_id == thread && r.lifecycle.is_active())
            .cloned()
            .collect();
        replies.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(replies)
    }
}

// ── Users ────────────────────────────────────────────────────────────────────

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: NewUser) -> DomainResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(DomainError::Conflict("username".into()));
        }
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(DomainError::Conflict("email".into()));
        }
        let now = Utc::now();
        let row = User {
            id: UserId(tables.next_id()),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            email_verified_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.profiles.insert(
            row.id,
            Profile {
                user_id: row.id,
                ..Profile::default()
            },
        );
        tables.users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: UserId) -> DomainResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_password(&self, id: UserId, password_hash: &str) -> DomainResult<()> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("user", id))?;
        user.password_hash = password_hash.to_string();
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn mark_email_verified(&self, id: UserId, at: DateTime<Utc>) -> DomainResult<()> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("user", id))?;
        user.email_verified_at.get_or_insert(at);
        Ok(())
    }

    async fn profile(&self, id: UserId) -> DomainResult<Profile> {
        let tables = self.tables.read().await;
        tables
            .profiles
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("profile", id))
    }

    async fn update_profile(&self, id: UserId, changes: ProfileChanges) -> DomainResult<Profile> {
        let mut tables = self.tables.write().await;
        let profile = tables
            .profiles
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("profile", id))?;
        profile.preferred_name = changes.preferred_name;
        profile.first_name = changes.first_name;
        profile.last_name = changes.last_name;
        profile.bio = changes.bio;
        Ok(profile.clone())
    }

    async fn list_profiles(&self) -> DomainResult<Vec<Profile>> {
        Ok(self.tables.read().await.profiles.values().cloned().collect())
    }
}

#[async_trait]
impl PasswordResetRepository for MemoryStore {
    async fn put(&self, record: PasswordResetRecord) -> DomainResult<()> {
        let mut tables = self.tables.write().await;
        tables.resets.insert(record.email.clone(), record);
        Ok(())
    }

    async fn find(&self, email: &str) -> DomainResult<Option<PasswordResetRecord>> {
        Ok(self.tables.read().await.resets.get(email).cloned())
    }

    async fn delete(&self, email: &str) -> DomainResult<()> {
        self.tables.write().await.resets.remove(email);
        Ok(())
    }
}

// ── Roles & permissions ──────────────────────────────────────────────────────

#[async_trait]
impl PermissionOracle for MemoryStore {
    async fn can(&self, actor: &Actor, permission: &Permission) -> DomainResult<bool> {
        let tables = self.tables.read().await;
        let Some(roles) = tables.user_roles.get(&actor.id) else {
            return Ok(false);
        };
        Ok(roles.iter().any(|role| {
            tables
                .roles
                .get(role)
                .is_some_and(|granted| granted.contains(permission))
        }))
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn ensure_role(&self, role: &str) -> DomainResult<()> {
        self.tables
            .write()
            .await
            .roles
            .entry(role.to_string())
            .or_default();
        Ok(())
    }

    async fn role_exists(&self, role: &str) -> DomainResult<bool> {
        Ok(self.tables.read().await.roles.contains_key(role))
    }

    async fn grant(&self, role: &str, permission: &Permission) -> DomainResult<()> {
        let mut tables = self.tables.write().await;
        let granted = tables
            .roles
            .get_mut(role)
            .ok_or_else(|| DomainError::not_found("role", role))?;
        granted.insert(permission.clone());
        Ok(())
    }

    async fn assign_role(&self, user: UserId, role: &str) -> DomainResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.roles.contains_key(role) {
            return Err(DomainError::not_found("role", role));
        }
        if !tables.users.contains_key(&user) {
            return Err(DomainError::not_found("user", user));
        }
        let held = tables.user_roles.entry(user).or_default();
        if !held.iter().any(|r| r == role) {
            held.push(role.to_string());
        }
        Ok(())
    }

    async fn roles_of(&self, user: UserId) -> DomainResult<Vec<String>> {
        let tables = self.tables.read().await;
        Ok(tables.user_roles.get(&user).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (MemoryStore, Category, Thread) {
        let store = MemoryStore::new();
        let user = store
            .create(NewUser {
                username: "tony".into(),
                email: "tony@example.com".into(),
                password_hash: "x".into(),
            })
            .await
            .unwrap();
        let category = CategoryRepository::insert(
            &store,
            CategoryFields {
                name: "General".into(),
                slug: "general".into(),
                description: None,
            },
        )
        .await
        .unwrap();
        let thread = ThreadRepository::insert(
            &store,
            NewThread {
                owner_id: user.id,
                fields: ThreadFields {
                    category_id: category.id,
                    title: "Suits".into(),
                    slug: "suits".into(),
                    body: "Mark 42".into(),
                },
            },
        )
        .await
        .unwrap();
        (store, category, thread)
    }

    #[tokio::test]
    async fn registration_creates_an_empty_profile() {
        let (store, _, thread) = seeded().await;
        let profile = store.profile(thread.owner_id).await.unwrap();
        assert_eq!(profile.user_id, thread.owner_id);
        assert_eq!(profile.bio, None);
    }

    #[tokio::test]
    async fn duplicate_usernames_conflict() {
        let (store, _, _) = seeded().await;
        let result = store
            .create(NewUser {
                username: "tony".into(),
                email: "other@example.com".into(),
                password_hash: "x".into(),
            })
            .await;
        assert!(matches!(result, Err(DomainError::Conflict(ref f)) if f == "username"));
    }

    #[tokio::test]
    async fn scopes_control_visibility_of_trashed_rows() {
        let (store, category, _) = seeded().await;
        assert!(ResourceStore::<Category>::soft_delete(&store, category.id, Utc::now())
            .await
            .unwrap());
        // A second soft delete finds nothing to do.
        assert!(!ResourceStore::<Category>::soft_delete(&store, category.id, Utc::now())
            .await
            .unwrap());

        let find = |scope| ResourceStore::<Category>::find(&store, category.id, scope);
        assert!(find(Scope::Active).await.unwrap().is_none());
        assert!(find(Scope::WithTrashed).await.unwrap().is_some());
        assert!(find(Scope::OnlyTrashed).await.unwrap().is_some());
        assert!(CategoryRepository::list(&store).await.unwrap().is_empty());

        assert!(ResourceStore::<Category>::restore(&store, category.id).await.unwrap());
        assert_eq!(find(Scope::Active).await.unwrap(), Some(category.clone()));
        assert!(find(Scope::OnlyTrashed).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn destroying_a_category_removes_its_threads_and_replies() {
        let (store, category, thread) = seeded().await;
        let reply = ReplyRepository::insert(
            &store,
            NewReply {
                owner_id: thread.owner_id,
                thread_id: thread.id,
                body: "Nice".into(),
            },
        )
        .await
        .unwrap();

        assert!(ResourceStore::<Category>::hard_delete(&store, category.id).await.unwrap());
        assert!(ResourceStore::<Thread>::find(&store, thread.id, Scope::WithTrashed)
            .await
            .unwrap()
            .is_none());
        assert!(ResourceStore::<Reply>::find(&store, reply.id, Scope::WithTrashed)
            .await
            .unwrap()
            .is_none());
        assert!(!ResourceStore::<Category>::hard_delete(&store, category.id).await.unwrap());
    }

    #[tokio::test]
    async fn reply_counts_ignore_trashed_replies() {
        let (store, _, thread) = seeded().await;
        let mut ids = Vec::new();
        for body in ["one", "two"] {
            let reply = ReplyRepository::insert(
                &store,
                NewReply {
                    owner_id: thread.owner_id,
                    thread_id: thread.id,
                    body: body.into(),
                },
            )
            .await
            .unwrap();
            ids.push(reply.id);
        }
        ResourceStore::<Reply>::soft_delete(&store, ids[0], Utc::now())
            .await
            .unwrap();

        let found = ThreadRepository::find_by_slug(&store, "suits", Scope::Active)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.replies_count, 1);
        assert_eq!(store.list_for_thread(thread.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn thread_pages_hold_twenty_five() {
        let (store, category, thread) = seeded().await;
        for n in 0..30 {
            ThreadRepository::insert(
                &store,
                NewThread {
                    owner_id: thread.owner_id,
                    fields: ThreadFields {
                        category_id: category.id,
                        title: format!("Thread {n}"),
                        slug: format!("thread-{n}"),
                        body: "...".into(),
                    },
                },
            )
            .await
            .unwrap();
        }
        let first = ThreadRepository::list(&store, &ThreadQuery::default()).await.unwrap();
        assert_eq!(first.data.len(), 25);
        assert_eq!(first.total, 31);
        assert_eq!(first.last_page, 2);
        assert_eq!(first.data[0].slug, "thread-29");

        let second = ThreadRepository::list(
            &store,
            &ThreadQuery {
                page: 2,
                ..ThreadQuery::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(second.data.len(), 6);
        assert_eq!(second.data.last().map(|t| t.id), Some(thread.id));
    }

    #[tokio::test]
    async fn permissions_flow_through_roles() {
        let (store, _, thread) = seeded().await;
        let actor = Actor {
            id: thread.owner_id,
            username: "tony".into(),
            email_verified: true,
        };
        let destroy = Permission::new("destroy threads");
        assert!(!store.can(&actor, &destroy).await.unwrap());

        store.ensure_role("moderator").await.unwrap();
        store.grant("moderator", &destroy).await.unwrap();
        store.assign_role(actor.id, "moderator").await.unwrap();
        store.assign_role(actor.id, "moderator").await.unwrap();

        assert!(store.can(&actor, &destroy).await.unwrap());
        assert_eq!(store.roles_of(actor.id).await.unwrap(), vec!["moderator"]);
        assert!(matches!(
            store.assign_role(actor.id, "ghost").await,
            Err(DomainError::NotFound { .. })
        ));
    }
}
