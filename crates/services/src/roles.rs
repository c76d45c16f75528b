//! Role administration. Roles are named bundles of permissions; the policy
//! only ever sees the permissions through the oracle.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

use domains::{
    Actor, DomainError, DomainResult, Permission, ResourceKind, RoleStore, UserRepository,
};

use crate::policy::Policy;
use crate::validation::Validator;

pub const MODERATOR: &str = "moderator";
pub const ADMIN: &str = "admin";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AssignRoleInput {
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleAssignment {
    pub username: String,
    pub roles: Vec<String>,
}

/// Every permission over forum content.
pub fn content_permissions() -> Vec<Permission> {
    [ResourceKind::Category, ResourceKind::Thread, ResourceKind::Reply]
        .into_iter()
        .flat_map(Permission::all_for)
        .collect()
}

pub struct RoleService {
    users: Arc<dyn UserRepository>,
    roles: Arc<dyn RoleStore>,
    policy: Policy,
}

impl RoleService {
    pub fn new(users: Arc<dyn UserRepository>, roles: Arc<dyn RoleStore>, policy: Policy) -> Self {
        Self {
            users,
            roles,
            policy,
        }
    }

    /// Creates the moderator and admin roles with their permissions.
    /// Safe to run repeatedly.
    pub async fn install_defaults(&self) -> DomainResult<()> {
        let content = content_permissions();

        self.roles.ensure_role(MODERATOR).await?;
        for permission in &content {
            self.roles.grant(MODERATOR, permission).await?;
        }

        let assign = Permission::assign_roles();
        self.roles.ensure_role(ADMIN).await?;
        for permission in content.iter().chain([&assign]) {
            self.roles.grant(ADMIN, permission).await?;
        }
        tracing::info!(permissions = content.len() + 1, "default roles installed");
        Ok(())
    }

    /// Gives `username` the role; returns all roles they now hold.
    #[instrument(skip(self, actor, input))]
    pub async fn assign(
        &self,
        actor: Option<&Actor>,
        username: &str,
        input: &AssignRoleInput,
    ) -> DomainResult<RoleAssignment> {
        let actor = self.policy.require(actor, &Permission::assign_roles()).await?;

        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| DomainError::not_found("user", username))?;

        let mut v = Validator::new();
        let role = v.required("role", input.role.as_deref());
        if let Some(role) = role {
            if !self.roles.role_exists(role).await? {
                v.fail("role", "The selected role is invalid.");
            }
        }
        v.finish()?;
        let Some(role) = role else {
            return Err(DomainError::internal("role missing after validation"));
        };

        self.roles.assign_role(user.id, role).await?;
        tracing::info!(actor = %actor.id, user = %user.id, role, "role assigned");
        Ok(RoleAssignment {
            roles: self.roles.roles_of(user.id).await?,
            username: user.username,
        })
    }
}
