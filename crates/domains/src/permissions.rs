//! # Permissions
//!
//! Vocabulary shared by the policy and the permission oracle. Resource
//! permissions are named `"<verb> <plural>"` (e.g. `"restore threads"`).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::UserId;

/// The invoking identity, resolved by the web layer from a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub id: UserId,
    pub username: String,
    pub email_verified: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Update,
    /// Soft delete.
    Delete,
    Restore,
    /// Hard delete.
    Destroy,
}

impl Action {
    pub fn verb(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Restore => "restore",
            Action::Destroy => "destroy",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Category,
    Thread,
    Reply,
}

impl ResourceKind {
    pub fn name(self) -> &'static str {
        match self {
            ResourceKind::Category => "category",
            ResourceKind::Thread => "thread",
            ResourceKind::Reply => "reply",
        }
    }

    pub fn plural(self) -> &'static str {
        match self {
            ResourceKind::Category => "categories",
            ResourceKind::Thread => "threads",
            ResourceKind::Reply => "replies",
        }
    }

    /// Self-service rights conferred by authorship. Destroy is never one of
    /// them, and categories have no author.
    pub fn owner_may(self, action: Action) -> bool {
        match self {
            ResourceKind::Category => false,
            ResourceKind::Thread | ResourceKind::Reply => {
                matches!(action, Action::Update | Action::Delete | Action::Restore)
            }
        }
    }

    /// Actions any authenticated member may perform without a permission.
    pub fn open_to_members(self, action: Action) -> bool {
        matches!(
            (self, action),
            (ResourceKind::Thread | ResourceKind::Reply, Action::Create)
        )
    }
}

/// A named permission held through roles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(String);

impl Permission {
    pub const ASSIGN_ROLES: &'static str = "assign roles";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn resource(action: Action, kind: ResourceKind) -> Self {
        Self(format!("{} {}", action.verb(), kind.plural()))
    }

    pub fn assign_roles() -> Self {
        Self(Self::ASSIGN_ROLES.to_string())
    }

    /// Every lifecycle permission for one resource kind.
    pub fn all_for(kind: ResourceKind) -> Vec<Permission> {
        [
            Action::Create,
            Action::Update,
            Action::Delete,
            Action::Restore,
            Action::Destroy,
        ]
        .into_iter()
        .map(|action| Self::resource(action, kind))
        .collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
