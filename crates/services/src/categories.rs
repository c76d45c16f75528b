//! Category management. Categories have no author, so every mutation is
//! gated on role permissions alone.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

use domains::{
    Actor, Category, CategoryFields, CategoryId, CategoryRepository, DomainError,
    DomainResult, Scope,
};

use crate::lifecycle::LifecycleController;
use crate::policy::Policy;
use crate::validation::{conflict_as_taken, Validator};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CategoryInput {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
}

pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
    lifecycle: LifecycleController<Category, dyn CategoryRepository>,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoryRepository>, policy: Policy) -> Self {
        Self {
            lifecycle: LifecycleController::new(repo.clone(), policy),
            repo,
        }
    }

    pub async fn index(&self) -> DomainResult<Vec<Category>> {
        self.repo.list().await
    }

    pub async fn show(&self, slug: &str) -> DomainResult<Category> {
        self.repo
            .find_by_slug(slug, Scope::Active)
            .await?
            .ok_or_else(|| DomainError::not_found("category", slug))
    }

    pub async fn authorize_create(&self, actor: Option<&Actor>) -> DomainResult<()> {
        self.lifecycle.authorize_create(actor).await?;
        Ok(())
    }

    #[instrument(skip(self, actor, input))]
    pub async fn create(
        &self,
        actor: Option<&Actor>,
        input: &CategoryInput,
    ) -> DomainResult<Category> {
        let actor = self.lifecycle.authorize_create(actor).await?;
        let fields = self.validate(input, None).await?;

        let category = self
            .repo
            .insert(fields)
            .await
            .map_err(|e| conflict_as_taken(e, "slug"))?;
        tracing::info!(actor = %actor.id, category = %category.id, slug = %category.slug, "category created");
        Ok(category)
    }

    /// Authorization check backing the edit form.
    pub async fn edit(&self, actor: Option<&Actor>, slug: &str) -> DomainResult<Category> {
        Policy::authenticated(actor)?;
        let category = self.show(slug).await?;
        self.lifecycle.authorize_update(actor, &category).await?;
        Ok(category)
    }

    #[instrument(skip(self, actor, input))]
    pub async fn update(
        &self,
        actor: Option<&Actor>,
        slug: &str,
        input: &CategoryInput,
    ) -> DomainResult<Category> {
        let category = self.edit(actor, slug).await?;
        let fields = self.validate(input, Some(category.id)).await?;

        let updated = self
            .repo
            .update(category.id, fields)
            .await
            .map_err(|e| conflict_as_taken(e, "slug"))?;
        tracing::info!(category = %updated.id, "category updated");
        Ok(updated)
    }

    pub async fn soft_delete(&self, actor: Option<&Actor>, id: CategoryId) -> DomainResult<Category> {
        self.lifecycle.soft_delete(actor, id).await
    }

    pub async fn restore(&self, actor: Option<&Actor>, id: CategoryId) -> DomainResult<Category> {
        self.lifecycle.restore(actor, id).await
    }

    pub async fn destroy(&self, actor: Option<&Actor>, id: CategoryId) -> DomainResult<()> {
        self.lifecycle.destroy(actor, id).await
    }

    async fn validate(
        &self,
        input: &CategoryInput,
        current: Option<CategoryId>,
    ) -> DomainResult<CategoryFields> {
        let mut v = Validator::new();
        let name = v.required("name", input.name.as_deref());
        v.max_len("name", name, 255);
        let slug = v.required("slug", input.slug.as_deref());
        v.alpha_dash("slug", slug);
        v.max_len("slug", slug, 255);

        if let Some(slug) = slug {
            // Soft-deleted categories keep their slug reserved.
            if let Some(existing) = self.repo.find_by_slug(slug, Scope::WithTrashed).await? {
                if Some(existing.id) != current {
                    v.taken("slug");
                }
            }
        }

        v.finish()?;
        let (Some(name), Some(slug)) = (name, slug) else {
            return Err(DomainError::internal("category fields missing after validation"));
        };
        Ok(CategoryFields {
            name: name.to_string(),
            slug: slug.to_string(),
            description: input
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(String::from),
        })
    }
}
