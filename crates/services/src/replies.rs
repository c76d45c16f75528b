//! Replies belong to a thread and are addressed through its category and slug.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

use domains::{
    Actor, CategoryRepository, DomainError, DomainResult, NewReply, Reply, ReplyId,
    ReplyRepository, ResourceStore, Scope, ThreadRepository,
};

use crate::lifecycle::LifecycleController;
use crate::policy::Policy;
use crate::threads::locate_thread;
use crate::validation::Validator;
use crate::Located;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ReplyInput {
    pub body: Option<String>,
}

pub struct ReplyService {
    replies: Arc<dyn ReplyRepository>,
    threads: Arc<dyn ThreadRepository>,
    categories: Arc<dyn CategoryRepository>,
    lifecycle: LifecycleController<Reply, dyn ReplyRepository>,
}

fn validate(input: &ReplyInput) -> DomainResult<String> {
    let mut v = Validator::new();
    let body = v.required("body", input.body.as_deref()).map(String::from);
    v.finish()?;
    body.ok_or_else(|| DomainError::internal("reply body missing after validation"))
}

impl ReplyService {
    pub fn new(
        replies: Arc<dyn ReplyRepository>,
        threads: Arc<dyn ThreadRepository>,
        categories: Arc<dyn CategoryRepository>,
        policy: Policy,
    ) -> Self {
        Self {
            lifecycle: LifecycleController::new(replies.clone(), policy),
            replies,
            threads,
            categories,
        }
    }

    async fn locate(
        &self,
        category_slug: &str,
        thread_slug: &str,
        id: ReplyId,
    ) -> DomainResult<Located<Reply>> {
        let (category, thread) = locate_thread(
            self.categories.as_ref(),
            self.threads.as_ref(),
            category_slug,
            thread_slug,
        )
        .await?;
        let reply = ResourceStore::<Reply>::find(self.replies.as_ref(), id, Scope::Active)
            .await?
            .filter(|r| r.thread_id == thread.id)
            .ok_or_else(|| DomainError::not_found("reply", id))?;
        Ok(Located::new(reply.path(&category.slug, &thread.slug), reply))
    }

    pub async fn show(
        &self,
        category_slug: &str,
        thread_slug: &str,
        id: ReplyId,
    ) -> DomainResult<Reply> {
        Ok(self.locate(category_slug, thread_slug, id).await?.resource)
    }

    pub async fn authorize_create(&self, actor: Option<&Actor>) -> DomainResult<()> {
        self.lifecycle.authorize_create(actor).await?;
        Ok(())
    }

    #[instrument(skip(self, actor, input))]
    pub async fn create(
        &self,
        actor: Option<&Actor>,
        category_slug: &str,
        thread_slug: &str,
        input: &ReplyInput,
    ) -> DomainResult<Located<Reply>> {
        Policy::authenticated(actor)?;
        let (category, thread) = locate_thread(
            self.categories.as_ref(),
            self.threads.as_ref(),
            category_slug,
            thread_slug,
        )
        .await?;
        let actor = self.lifecycle.authorize_create(actor).await?;
        let body = validate(input)?;

        let reply = self
            .replies
            .insert(NewReply {
                owner_id: actor.id,
                thread_id: thread.id,
                body,
            })
            .await?;
        tracing::info!(actor = %actor.id, thread = %thread.id, reply = %reply.id, "reply created");
        Ok(Located::new(reply.path(&category.slug, &thread.slug), reply))
    }

    pub async fn edit(
        &self,
        actor: Option<&Actor>,
        category_slug: &str,
        thread_slug: &str,
        id: ReplyId,
    ) -> DomainResult<Located<Reply>> {
        Policy::authenticated(actor)?;
        let located = self.locate(category_slug, thread_slug, id).await?;
        self.lifecycle
            .authorize_update(actor, &located.resource)
            .await?;
        Ok(located)
    }

    #[instrument(skip(self, actor, input))]
    pub async fn update(
        &self,
        actor: Option<&Actor>,
        category_slug: &str,
        thread_slug: &str,
        id: ReplyId,
        input: &ReplyInput,
    ) -> DomainResult<Located<Reply>> {
        let located = self.edit(actor, category_slug, thread_slug, id).await?;
        let body = validate(input)?;

        let reply = self.replies.update(id, body).await?;
        tracing::info!(reply = %reply.id, "reply updated");
        Ok(Located::new(located.path, reply))
    }

    pub async fn soft_delete(&self, actor: Option<&Actor>, id: ReplyId) -> DomainResult<Reply> {
        self.lifecycle.soft_delete(actor, id).await
    }

    pub async fn restore(&self, actor: Option<&Actor>, id: ReplyId) -> DomainResult<Reply> {
        self.lifecycle.restore(actor, id).await
    }

    /// Never granted by authorship alone.
    pub async fn destroy(&self, actor: Option<&Actor>, id: ReplyId) -> DomainResult<()> {
        self.lifecycle.destroy(actor, id).await
    }
}
