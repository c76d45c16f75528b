//! # Lifecycle
//!
//! Every content resource moves through
//! `Active -> SoftDeleted -> {Active | Destroyed}`. Storage keeps a nullable
//! `deleted_at` column; the domain only ever sees this tagged state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle state of a category, thread, or reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Lifecycle {
    Active,
    SoftDeleted { at: DateTime<Utc> },
    /// Terminal. Never persisted: a destroyed row no longer exists.
    Destroyed,
}

/// Rejected state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot {attempted} a resource that is {from}")]
pub struct TransitionError {
    pub from: &'static str,
    pub attempted: &'static str,
}

impl Lifecycle {
    /// Maps the storage representation onto the tagged state.
    pub fn from_deleted_at(deleted_at: Option<DateTime<Utc>>) -> Self {
        match deleted_at {
            Some(at) => Self::SoftDeleted { at },
            None => Self::Active,
        }
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::SoftDeleted { at } => Some(*at),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn is_soft_deleted(&self) -> bool {
        matches!(self, Self::SoftDeleted { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::SoftDeleted { .. } => "soft-deleted",
            Self::Destroyed => "destroyed",
        }
    }

    pub fn archive(self, at: DateTime<Utc>) -> Result<Self, TransitionError> {
        match self {
            Self::Active => Ok(Self::SoftDeleted { at }),
            other => Err(other.reject("delete")),
        }
    }

    pub fn restore(self) -> Result<Self, TransitionError> {
        match self {
            Self::SoftDeleted { .. } => Ok(Self::Active),
            other => Err(other.reject("restore")),
        }
    }

    pub fn destroy(self) -> Result<Self, TransitionError> {
        match self {
            Self::Active | Self::SoftDeleted { .. } => Ok(Self::Destroyed),
            other => Err(other.reject("destroy")),
        }
    }

    fn reject(self, attempted: &'static str) -> TransitionError {
        TransitionError {
            from: self.name(),
            attempted,
        }
    }
}

/// Which lifecycle states a store lookup may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Default queries: soft-deleted rows are invisible.
    Active,
    WithTrashed,
    OnlyTrashed,
}

impl Scope {
    pub fn admits(self, lifecycle: &Lifecycle) -> bool {
        match self {
            Scope::Active => lifecycle.is_active(),
            Scope::WithTrashed => !matches!(lifecycle, Lifecycle::Destroyed),
            Scope::OnlyTrashed => lifecycle.is_soft_deleted(),
        }
    }
}
