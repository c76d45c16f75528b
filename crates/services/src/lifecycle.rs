//! # Lifecycle controller
//!
//! Soft-delete, restore and destroy for any [`Resource`]. Every operation runs
//! authenticate -> locate -> authorize -> transition -> persist, and the store
//! is only touched once every check has passed.

use chrono::Utc;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::instrument;

use domains::{
    Action, Actor, DomainError, DomainResult, Resource, ResourceStore, Scope, TransitionError,
};

use crate::policy::Policy;

pub struct LifecycleController<R, S: ?Sized> {
    store: Arc<S>,
    policy: Policy,
    _resource: PhantomData<fn() -> R>,
}

impl<R, S> LifecycleController<R, S>
where
    R: Resource,
    S: ResourceStore<R> + ?Sized,
{
    pub fn new(store: Arc<S>, policy: Policy) -> Self {
        Self {
            store,
            policy,
            _resource: PhantomData,
        }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Finds a resource in the given scope or fails with `NotFound`.
    pub async fn locate(&self, id: R::Id, scope: Scope) -> DomainResult<R> {
        self.store
            .find(id, scope)
            .await?
            .ok_or_else(|| DomainError::not_found(R::KIND.name(), id))
    }

    pub async fn authorize<'a>(
        &self,
        actor: Option<&'a Actor>,
        action: Action,
        resource: Option<&R>,
    ) -> DomainResult<&'a Actor> {
        self.policy
            .authorize(actor, action, R::KIND, resource.and_then(Resource::owner_id))
            .await
    }

    pub async fn authorize_create<'a>(&self, actor: Option<&'a Actor>) -> DomainResult<&'a Actor> {
        self.authorize(actor, Action::Create, None).await
    }

    pub async fn authorize_update<'a>(
        &self,
        actor: Option<&'a Actor>,
        resource: &R,
    ) -> DomainResult<&'a Actor> {
        self.authorize(actor, Action::Update, Some(resource)).await
    }

    #[instrument(skip(self, actor), fields(resource = R::KIND.name(), id = %id))]
    pub async fn soft_delete(&self, actor: Option<&Actor>, id: R::Id) -> DomainResult<R> {
        Policy::authenticated(actor)?;
        let mut resource = self.locate(id, Scope::Active).await?;
        let actor = self.authorize(actor, Action::Delete, Some(&resource)).await?;

        let now = Utc::now();
        let next = resource
            .lifecycle()
            .archive(now)
            .map_err(|e| transition_failed::<R>(id, e))?;
        if !self.store.soft_delete(id, now).await? {
            return Err(DomainError::not_found(R::KIND.name(), id));
        }
        resource.set_lifecycle(next);

        tracing::info!(actor = %actor.id, "{} soft-deleted", R::KIND.name());
        Ok(resource)
    }

    #[instrument(skip(self, actor), fields(resource = R::KIND.name(), id = %id))]
    pub async fn restore(&self, actor: Option<&Actor>, id: R::Id) -> DomainResult<R> {
        Policy::authenticated(actor)?;
        let mut resource = self.locate(id, Scope::OnlyTrashed).await?;
        let actor = self.authorize(actor, Action::Restore, Some(&resource)).await?;

        let next = resource
            .lifecycle()
            .restore()
            .map_err(|e| transition_failed::<R>(id, e))?;
        if !self.store.restore(id).await? {
            return Err(DomainError::not_found(R::KIND.name(), id));
        }
        resource.set_lifecycle(next);

        tracing::info!(actor = %actor.id, "{} restored", R::KIND.name());
        Ok(resource)
    }

    /// Permanent removal, whether or not the resource was soft-deleted first.
    #[instrument(skip(self, actor), fields(resource = R::KIND.name(), id = %id))]
    pub async fn destroy(&self, actor: Option<&Actor>, id: R::Id) -> DomainResult<()> {
        Policy::authenticated(actor)?;
        let resource = self.locate(id, Scope::WithTrashed).await?;
        let actor = self.authorize(actor, Action::Destroy, Some(&resource)).await?;

        resource
            .lifecycle()
            .destroy()
            .map_err(|e| transition_failed::<R>(id, e))?;
        if !self.store.hard_delete(id).await? {
            return Err(DomainError::not_found(R::KIND.name(), id));
        }

        tracing::info!(actor = %actor.id, "{} destroyed", R::KIND.name());
        Ok(())
    }
}

fn transition_failed<R: Resource>(id: R::Id, err: TransitionError) -> DomainError {
    tracing::debug!(id = %id, error = %err, "illegal lifecycle transition");
    DomainError::not_found(R::KIND.name(), id)
}
