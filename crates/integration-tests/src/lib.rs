//! # integration-tests
//!
//! Shared harness for the black-box tests under `tests/`. [`TestApp`] wires
//! the real services, auth adapters and axum router over an in-memory store,
//! and captures outgoing mail in an [`Outbox`] so verification links and
//! reset tokens can be followed.

pub mod outbox;
pub mod wiring;

#[cfg(feature = "web-axum")]
pub mod app;

pub use outbox::Outbox;
pub use wiring::{forum_services, BASE_URL, MAX_LOGIN_ATTEMPTS};

#[cfg(feature = "web-axum")]
pub use app::{Session, TestApp, TestResponse};

/// Password used for every account the harness creates.
pub const PASSWORD: &str = "secret-password";
