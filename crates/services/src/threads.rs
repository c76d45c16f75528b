//! Threads: listing with the filter chain, lookup by category and slug, and
//! the owner-aware lifecycle.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

use domains::{
    Actor, Category, CategoryId, CategoryRepository, DomainError, DomainResult, NewThread, Page,
    ReplyRepository, Scope, Thread, ThreadDetail, ThreadFields, ThreadId, ThreadQuery,
    ThreadRepository, UserRepository,
};

use crate::lifecycle::LifecycleController;
use crate::policy::Policy;
use crate::validation::{conflict_as_taken, Validator};
use crate::Located;

/// Query-string filters accepted by the thread listing.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ThreadFilter {
    /// Username of the thread owner.
    pub by: Option<String>,
    pub popular: Option<String>,
    pub unanswered: Option<String>,
    pub page: Option<String>,
}

fn flag(value: &Option<String>) -> bool {
    match value.as_deref().map(str::trim) {
        None => false,
        Some(v) => !matches!(v, "0" | "false" | "no" | "off"),
    }
}

impl ThreadFilter {
    /// Pages below 1 or unparsable values fall back to the first page.
    pub fn page(&self) -> u32 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<u32>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1)
    }
}

/// Form fields may arrive as text (urlencoded) or numbers (JSON).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum IdField {
    Number(i64),
    Text(String),
}

impl IdField {
    fn as_text(&self) -> Option<String> {
        match self {
            IdField::Number(n) => Some(n.to_string()),
            IdField::Text(t) => Some(t.clone()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ThreadInput {
    pub category_id: Option<IdField>,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub body: Option<String>,
}

pub struct ThreadService {
    threads: Arc<dyn ThreadRepository>,
    categories: Arc<dyn CategoryRepository>,
    replies: Arc<dyn ReplyRepository>,
    users: Arc<dyn UserRepository>,
    lifecycle: LifecycleController<Thread, dyn ThreadRepository>,
}

/// Resolves a category slug and a thread slug, requiring the thread to
/// belong to that category.
pub(crate) async fn locate_thread(
    categories: &dyn CategoryRepository,
    threads: &dyn ThreadRepository,
    category_slug: &str,
    thread_slug: &str,
) -> DomainResult<(Category, Thread)> {
    let category = categories
        .find_by_slug(category_slug, Scope::Active)
        .await?
        .ok_or_else(|| DomainError::not_found("category", category_slug))?;
    let thread = threads
        .find_by_slug(thread_slug, Scope::Active)
        .await?
        .filter(|t| t.category_id == category.id)
        .ok_or_else(|| DomainError::not_found("thread", thread_slug))?;
    Ok((category, thread))
}

impl ThreadService {
    pub fn new(
        threads: Arc<dyn ThreadRepository>,
        categories: Arc<dyn CategoryRepository>,
        replies: Arc<dyn ReplyRepository>,
        users: Arc<dyn UserRepository>,
        policy: Policy,
    ) -> Self {
        Self {
            lifecycle: LifecycleController::new(threads.clone(), policy),
            threads,
            categories,
            replies,
            users,
        }
    }

    /// Most recent first, 25 per page, optionally scoped to one category.
    #[instrument(skip(self, filter))]
    pub async fn index(
        &self,
        category_slug: Option<&str>,
        filter: &ThreadFilter,
    ) -> DomainResult<Page<Thread>> {
        let mut query = ThreadQuery {
            page: filter.page(),
            popular: flag(&filter.popular),
            unanswered: flag(&filter.unanswered),
            ..ThreadQuery::default()
        };

        if let Some(slug) = category_slug {
            let category = self
                .categories
                .find_by_slug(slug, Scope::Active)
                .await?
                .ok_or_else(|| DomainError::not_found("category", slug))?;
            query.category_id = Some(category.id);
        }

        if let Some(username) = filter.by.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            let owner = self
                .users
                .find_by_username(username)
                .await?
                .ok_or_else(|| DomainError::not_found("user", username))?;
            query.owner_id = Some(owner.id);
        }

        self.threads.list(&query).await
    }

    pub async fn show(&self, category_slug: &str, thread_slug: &str) -> DomainResult<ThreadDetail> {
        let (_, thread) = locate_thread(
            self.categories.as_ref(),
            self.threads.as_ref(),
            category_slug,
            thread_slug,
        )
        .await?;
        let replies = self.replies.list_for_thread(thread.id).await?;
        Ok(ThreadDetail { thread, replies })
    }

    pub async fn authorize_create(&self, actor: Option<&Actor>) -> DomainResult<()> {
        self.lifecycle.authorize_create(actor).await?;
        Ok(())
    }

    #[instrument(skip(self, actor, input))]
    pub async fn create(
        &self,
        actor: Option<&Actor>,
        input: &ThreadInput,
    ) -> DomainResult<Located<Thread>> {
        let actor = self.lifecycle.authorize_create(actor).await?;
        let (category, fields) = self.validate(input, None).await?;

        let thread = self
            .threads
            .insert(NewThread {
                owner_id: actor.id,
                fields,
            })
            .await
            .map_err(|e| conflict_as_taken(e, "slug"))?;
        tracing::info!(actor = %actor.id, thread = %thread.id, slug = %thread.slug, "thread created");
        Ok(Located::new(thread.path(&category.slug), thread))
    }

    pub async fn edit(
        &self,
        actor: Option<&Actor>,
        category_slug: &str,
        thread_slug: &str,
    ) -> DomainResult<Thread> {
        Policy::authenticated(actor)?;
        let (_, thread) = locate_thread(
            self.categories.as_ref(),
            self.threads.as_ref(),
            category_slug,
            thread_slug,
        )
        .await?;
        self.lifecycle.authorize_update(actor, &thread).await?;
        Ok(thread)
    }

    #[instrument(skip(self, actor, input))]
    pub async fn update(
        &self,
        actor: Option<&Actor>,
        category_slug: &str,
        thread_slug: &str,
        input: &ThreadInput,
    ) -> DomainResult<Located<Thread>> {
        let thread = self.edit(actor, category_slug, thread_slug).await?;
        let (category, fields) = self.validate(input, Some(thread.id)).await?;

        let updated = self
            .threads
            .update(thread.id, fields)
            .await
            .map_err(|e| conflict_as_taken(e, "slug"))?;
        tracing::info!(thread = %updated.id, "thread updated");
        Ok(Located::new(updated.path(&category.slug), updated))
    }

    pub async fn soft_delete(&self, actor: Option<&Actor>, id: ThreadId) -> DomainResult<Thread> {
        self.lifecycle.soft_delete(actor, id).await
    }

    pub async fn restore(&self, actor: Option<&Actor>, id: ThreadId) -> DomainResult<Thread> {
        self.lifecycle.restore(actor, id).await
    }

    pub async fn destroy(&self, actor: Option<&Actor>, id: ThreadId) -> DomainResult<()> {
        self.lifecycle.destroy(actor, id).await
    }

    async fn validate(
        &self,
        input: &ThreadInput,
        current: Option<ThreadId>,
    ) -> DomainResult<(Category, ThreadFields)> {
        let mut v = Validator::new();

        let raw_category = input.category_id.as_ref().and_then(IdField::as_text);
        let mut category = None;
        if let Some(raw) = v.required("category_id", raw_category.as_deref()) {
            match raw.parse::<i64>() {
                Ok(id) => {
                    category = self
                        .categories
                        .find(CategoryId(id), Scope::Active)
                        .await?;
                    if category.is_none() {
                        v.fail("category_id", "The selected category id is invalid.");
                    }
                }
                Err(_) => v.fail("category_id", "The category id must be an integer."),
            }
        }

        let title = v.required("title", input.title.as_deref());
        v.max_len("title", title, 255);
        let slug = v.required("slug", input.slug.as_deref());
        v.alpha_dash("slug", slug);
        v.max_len("slug", slug, 255);
        let body = v.required("body", input.body.as_deref());

        if let Some(slug) = slug {
            if let Some(existing) = self.threads.find_by_slug(slug, Scope::WithTrashed).await? {
                if Some(existing.id) != current {
                    v.taken("slug");
                }
            }
        }

        v.finish()?;
        let (Some(category), Some(title), Some(slug), Some(body)) = (category, title, slug, body)
        else {
            return Err(DomainError::internal("thread fields missing after validation"));
        };
        let fields = ThreadFields {
            category_id: category.id,
            title: title.to_string(),
            slug: slug.to_string(),
            body: body.to_string(),
        };
        Ok((category, fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{
        CategoryFields, MockPermissionOracle, NewReply, NewUser, Permission, ResourceStore,
    };
    use storage_adapters::memory::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        service: ThreadService,
        alice: Actor,
        bob: Actor,
        general: Category,
        offtopic: Category,
    }

    fn member(user: &domains::User) -> Actor {
        Actor {
            id: user.id,
            username: user.username.clone(),
            email_verified: true,
        }
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let mut actors = Vec::new();
        for name in ["alice", "bob"] {
            let user = UserRepository::create(
                store.as_ref(),
                NewUser {
                    username: name.into(),
                    email: format!("{name}@example.com"),
                    password_hash: "x".into(),
                },
            )
            .await
            .unwrap();
            actors.push(member(&user));
        }
        let mut categories = Vec::new();
        for slug in ["general", "off-topic"] {
            categories.push(
                CategoryRepository::insert(
                    store.as_ref(),
                    CategoryFields {
                        name: slug.into(),
                        slug: slug.into(),
                        description: None,
                    },
                )
                .await
                .unwrap(),
            );
        }

        let mut oracle = MockPermissionOracle::new();
        oracle.expect_can().returning(|_: &Actor, _: &Permission| Ok(false));
        let service = ThreadService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            Policy::new(Arc::new(oracle)),
        );

        let bob = actors.pop().unwrap();
        let alice = actors.pop().unwrap();
        let offtopic = categories.pop().unwrap();
        let general = categories.pop().unwrap();
        Fixture {
            store,
            service,
            alice,
            bob,
            general,
            offtopic,
        }
    }

    fn input(category: CategoryId, slug: &str) -> ThreadInput {
        ThreadInput {
            category_id: Some(IdField::Number(category.0)),
            title: Some(format!("About {slug}")),
            slug: Some(slug.into()),
            body: Some("Some words".into()),
        }
    }

    #[tokio::test]
    async fn members_create_threads_and_get_a_path_back() {
        let f = fixture().await;
        let created = f
            .service
            .create(Some(&f.alice), &input(f.general.id, "hello-world"))
            .await
            .unwrap();
        assert_eq!(created.path, "/community/categories/general/threads/hello-world");
        assert_eq!(created.resource.owner_id, f.alice.id);
    }

    #[tokio::test]
    async fn guests_cannot_create_threads() {
        let f = fixture().await;
        let result = f.service.create(None, &input(f.general.id, "nope")).await;
        assert!(matches!(result, Err(DomainError::Unauthenticated)));
        let page = f.service.index(None, &ThreadFilter::default()).await.unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn validation_reports_every_field() {
        let f = fixture().await;
        let bad = ThreadInput {
            category_id: Some(IdField::Text("abc".into())),
            slug: Some("not a slug".into()),
            ..ThreadInput::default()
        };
        let Err(DomainError::Validation(errors)) = f.service.create(Some(&f.alice), &bad).await
        else {
            panic!("expected validation failure");
        };
        for field in ["category_id", "title", "slug", "body"] {
            assert!(errors.has(field), "missing error for {field}");
        }
    }

    #[tokio::test]
    async fn unknown_category_id_is_invalid() {
        let f = fixture().await;
        let result = f
            .service
            .create(Some(&f.alice), &input(CategoryId(999), "orphan"))
            .await;
        assert!(matches!(result, Err(DomainError::Validation(ref e)) if e.has("category_id")));
    }

    #[tokio::test]
    async fn duplicate_slugs_are_taken_even_when_trashed() {
        let f = fixture().await;
        let first = f
            .service
            .create(Some(&f.alice), &input(f.general.id, "dup"))
            .await
            .unwrap();
        f.service
            .soft_delete(Some(&f.alice), first.resource.id)
            .await
            .unwrap();
        let result = f
            .service
            .create(Some(&f.bob), &input(f.general.id, "dup"))
            .await;
        assert!(matches!(result, Err(DomainError::Validation(ref e)) if e.has("slug")));
    }

    #[tokio::test]
    async fn filtering_by_unknown_user_is_not_found() {
        let f = fixture().await;
        let filter = ThreadFilter {
            by: Some("nobody".into()),
            ..ThreadFilter::default()
        };
        let result = f.service.index(None, &filter).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn listing_is_scoped_by_owner_and_category() {
        let f = fixture().await;
        f.service
            .create(Some(&f.alice), &input(f.general.id, "a-general"))
            .await
            .unwrap();
        f.service
            .create(Some(&f.bob), &input(f.offtopic.id, "b-offtopic"))
            .await
            .unwrap();

        let general = f
            .service
            .index(Some("general"), &ThreadFilter::default())
            .await
            .unwrap();
        assert_eq!(general.data.len(), 1);
        assert!(general.data.iter().all(|t| t.category_id == f.general.id));

        let by_bob = f
            .service
            .index(
                None,
                &ThreadFilter {
                    by: Some("bob".into()),
                    ..ThreadFilter::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(by_bob.data.len(), 1);
        assert_eq!(by_bob.data[0].owner_id, f.bob.id);

        assert!(matches!(
            f.service.index(Some("missing"), &ThreadFilter::default()).await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn unanswered_and_popular_use_active_replies() {
        let f = fixture().await;
        let quiet = f
            .service
            .create(Some(&f.alice), &input(f.general.id, "quiet"))
            .await
            .unwrap();
        let busy = f
            .service
            .create(Some(&f.alice), &input(f.general.id, "busy"))
            .await
            .unwrap();
        ReplyRepository::insert(
            f.store.as_ref(),
            NewReply {
                owner_id: f.bob.id,
                thread_id: busy.resource.id,
                body: "+1".into(),
            },
        )
        .await
        .unwrap();

        let unanswered = f
            .service
            .index(
                None,
                &ThreadFilter {
                    unanswered: Some("1".into()),
                    ..ThreadFilter::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(
            unanswered.data.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![quiet.resource.id]
        );

        let popular = f
            .service
            .index(
                None,
                &ThreadFilter {
                    popular: Some(String::new()),
                    ..ThreadFilter::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(popular.data[0].id, busy.resource.id);
        assert_eq!(popular.data[0].replies_count, 1);
    }

    #[tokio::test]
    async fn show_requires_the_matching_category() {
        let f = fixture().await;
        f.service
            .create(Some(&f.alice), &input(f.general.id, "placed"))
            .await
            .unwrap();
        assert!(f.service.show("general", "placed").await.is_ok());
        assert!(matches!(
            f.service.show("off-topic", "placed").await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn owner_archives_and_restores_but_cannot_destroy() {
        let f = fixture().await;
        let thread = f
            .service
            .create(Some(&f.alice), &input(f.general.id, "mine"))
            .await
            .unwrap()
            .resource;

        f.service.soft_delete(Some(&f.alice), thread.id).await.unwrap();
        let page = f.service.index(None, &ThreadFilter::default()).await.unwrap();
        assert!(page.data.is_empty());

        f.service.restore(Some(&f.alice), thread.id).await.unwrap();
        let page = f.service.index(None, &ThreadFilter::default()).await.unwrap();
        assert_eq!(page.data, vec![thread.clone()]);

        assert!(matches!(
            f.service.destroy(Some(&f.alice), thread.id).await,
            Err(DomainError::Forbidden(_))
        ));
        assert!(ResourceStore::<Thread>::find(f.store.as_ref(), thread.id, Scope::WithTrashed)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn strangers_cannot_edit() {
        let f = fixture().await;
        f.service
            .create(Some(&f.alice), &input(f.general.id, "alices"))
            .await
            .unwrap();
        assert!(matches!(
            f.service.edit(Some(&f.bob), "general", "alices").await,
            Err(DomainError::Forbidden(_))
        ));
        assert!(f.service.edit(Some(&f.alice), "general", "alices").await.is_ok());
    }

    #[test]
    fn filter_flags_and_pages() {
        let filter = ThreadFilter {
            popular: Some("0".into()),
            unanswered: Some("".into()),
            page: Some("-2".into()),
            ..ThreadFilter::default()
        };
        assert!(!flag(&filter.popular));
        assert!(flag(&filter.unanswered));
        assert_eq!(filter.page(), 1);
        assert_eq!(
            ThreadFilter {
                page: Some("3".into()),
                ..ThreadFilter::default()
            }
            .page(),
            3
        );
    }
}
