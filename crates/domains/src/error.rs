//! # DomainError
//!
//! Centralized error handling for the forum. Every service returns
//! [`DomainResult`]; adapters translate their own failures into it.

use thiserror::Error;

use crate::validation::ValidationErrors;

/// The primary error type for all domain and service operations.
#[derive(Error, Debug)]
pub enum DomainError {
    /// No identity was presented for an operation that requires one.
    #[error("unauthenticated")]
    Unauthenticated,

    /// The actor is known but lacks the permission or ownership required.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Resource absent, or not in the lifecycle state the operation expects.
    #[error("{resource} not found: {key}")]
    NotFound { resource: &'static str, key: String },

    /// One or more input fields failed validation.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// Uniqueness constraint violated at the storage layer.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Infrastructure failure (database down, hashing failure, ...).
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(resource: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            resource,
            key: key.to_string(),
        }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden(reason.into())
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<ValidationErrors> for DomainError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

/// A specialized Result type for forum logic.
pub type DomainResult<T> = std::result::Result<T, DomainError>;
