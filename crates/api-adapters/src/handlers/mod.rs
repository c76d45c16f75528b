//! # Handlers
//!
//! Thin adapters from HTTP onto the services. Successful writes answer with
//! `303 See Other` pointing at the resource; reads answer with JSON.

pub mod accounts;
pub mod categories;
pub mod home;
pub mod profiles;
pub mod replies;
pub mod roles;
pub mod threads;

use axum::response::{IntoResponse, Redirect, Response};
use serde_json::{json, Value};

use domains::DomainError;

use crate::error::ApiError;

pub(crate) fn see_other(path: &str) -> Response {
    Redirect::to(path).into_response()
}

/// Numeric route keys; anything else cannot name a row.
pub(crate) fn parse_id<T: From<i64>>(resource: &'static str, raw: &str) -> Result<T, ApiError> {
    raw.parse::<i64>()
        .map(T::from)
        .map_err(|_| DomainError::not_found(resource, raw).into())
}

/// Where an HTML form for this page would submit.
pub(crate) fn form(action: &str, method: &str) -> Value {
    json!({ "action": action, "method": method })
}
