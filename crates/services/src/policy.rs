//! Shared authorization policy for categories, threads and replies.

use std::sync::Arc;

use domains::{
    Action, Actor, DomainError, DomainResult, Permission, PermissionOracle, ResourceKind, UserId,
};

/// Resolves whether an actor may perform an action on a kind of resource,
/// combining role permissions with authorship.
#[derive(Clone)]
pub struct Policy {
    oracle: Arc<dyn PermissionOracle>,
}

impl Policy {
    pub fn new(oracle: Arc<dyn PermissionOracle>) -> Self {
        Self { oracle }
    }

    /// Guests are rejected before anything else is looked at.
    pub fn authenticated(actor: Option<&Actor>) -> DomainResult<&Actor> {
        actor.ok_or(DomainError::Unauthenticated)
    }

    pub async fn authorize<'a>(
        &self,
        actor: Option<&'a Actor>,
        action: Action,
        kind: ResourceKind,
        owner: Option<UserId>,
    ) -> DomainResult<&'a Actor> {
        let actor = Self::authenticated(actor)?;

        if kind.open_to_members(action) {
            return Ok(actor);
        }
        if owner == Some(actor.id) && kind.owner_may(action) {
            return Ok(actor);
        }
        if self
            .oracle
            .can(actor, &Permission::resource(action, kind))
            .await?
        {
            return Ok(actor);
        }

        tracing::debug!(
            actor = %actor.id,
            action = action.verb(),
            resource = kind.name(),
            "authorization denied"
        );
        Err(DomainError::forbidden(format!(
            "{} {}",
            action.verb(),
            kind.name()
        )))
    }

    /// Gate on a single named permission, with no ownership override.
    pub async fn require<'a>(
        &self,
        actor: Option<&'a Actor>,
        permission: &Permission,
    ) -> DomainResult<&'a Actor> {
        let actor = Self::authenticated(actor)?;
        if self.oracle.can(actor, permission).await? {
            Ok(actor)
        } else {
            Err(DomainError::forbidden(permission.to_string()))
        }
    }
}
