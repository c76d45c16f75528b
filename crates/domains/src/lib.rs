//! # domains
//!
//! Entities, lifecycle state, permission vocabulary and the port traits that
//! every adapter crate implements. Nothing in here performs I/O.

pub mod error;
pub mod lifecycle;
pub mod models;
pub mod permissions;
pub mod ports;
pub mod validation;

pub use error::*;
pub use lifecycle::*;
pub use models::*;
pub use permissions::*;
pub use ports::*;
pub use validation::*;
