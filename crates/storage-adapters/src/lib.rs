//! # storage-adapters
//!
//! Implementations of the repository, role and throttle ports.
//!
//! - [`memory`]: everything in process, always available.
//! - [`throttle`]: login attempt counting.
//! - `postgres`: sqlx-backed stores, behind the `db-postgres` feature.

pub mod memory;
pub mod throttle;

#[cfg(feature = "db-postgres")]
pub mod postgres;

pub use memory::MemoryStore;
pub use throttle::MemoryLoginThrottle;

#[cfg(feature = "db-postgres")]
pub use postgres::PgStore;
