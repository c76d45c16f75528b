//! # ApiError
//!
//! Maps [`DomainError`] onto HTTP. Guests are sent to the login page,
//! validation failures come back as 422 with every failing field and the
//! submitted input (minus passwords).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use domains::{DomainError, DomainResult, ValidationErrors};

/// Input fields that are never echoed back.
const SECRET_FIELDS: &[&str] = &["password", "password_confirmation", "token"];

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{error}")]
    Domain {
        #[source]
        error: DomainError,
        /// Submitted input, flashed back on validation failure.
        old: Option<Value>,
    },

    /// The request body or query string could not be decoded.
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn with_old<I: Serialize>(self, input: &I) -> Self {
        match self {
            ApiError::Domain { error, .. } => ApiError::Domain {
                error,
                old: Some(old_input(input)),
            },
            other => other,
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        ApiError::Domain { error, old: None }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        DomainError::from(errors).into()
    }
}

/// Attaches the submitted input to a failed result.
pub trait WithOld<T> {
    fn with_old<I: Serialize>(self, input: &I) -> Result<T, ApiError>;
}

impl<T> WithOld<T> for DomainResult<T> {
    fn with_old<I: Serialize>(self, input: &I) -> Result<T, ApiError> {
        self.map_err(|err| ApiError::from(err).with_old(input))
    }
}

pub(crate) fn old_input<I: Serialize>(input: &I) -> Value {
    let mut value = serde_json::to_value(input).unwrap_or(Value::Null);
    if let Value::Object(fields) = &mut value {
        for secret in SECRET_FIELDS {
            fields.remove(*secret);
        }
        fields.retain(|_, v| !v.is_null());
    }
    value
}

fn validation_response(errors: &ValidationErrors, old: Option<Value>) -> Response {
    let body = json!({
        "message": "The given data was invalid.",
        "errors": errors,
        "old": old.unwrap_or_else(|| json!({})),
    });
    (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (error, old) = match self {
            ApiError::BadRequest(message) => {
                return (StatusCode::BAD_REQUEST, Json(json!({ "message": message })))
                    .into_response();
            }
            ApiError::Domain { error, old } => (error, old),
        };

        match error {
            DomainError::Unauthenticated => Redirect::to("/login").into_response(),
            DomainError::Forbidden(reason) => {
                tracing::debug!(%reason, "forbidden");
                (
                    StatusCode::FORBIDDEN,
                    Json(json!({ "message": "This action is unauthorized." })),
                )
                    .into_response()
            }
            DomainError::NotFound { resource, key } => {
                tracing::debug!(resource, %key, "not found");
                (StatusCode::NOT_FOUND, Json(json!({ "message": "Not Found" }))).into_response()
            }
            DomainError::Validation(errors) => validation_response(&errors, old),
            DomainError::Conflict(field) => {
                let errors =
                    ValidationErrors::single(&field, format!("The {field} has already been taken."));
                validation_response(&errors, old)
            }
            DomainError::Internal(message) => {
                tracing::error!(error = %message, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "Server Error" })),
                )
                    .into_response()
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
