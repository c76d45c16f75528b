//! # auth-adapters
//!
//! Credential handling behind the account ports: password hashing, signed
//! verification links, reset tokens, session tokens (`auth-jwt`) and a
//! notifier that logs instead of mailing.

pub mod notify;
pub mod password;
pub mod signing;
pub mod tokens;

#[cfg(feature = "auth-jwt")]
pub mod jwt;

pub use notify::LogNotifier;
pub use password::Argon2Hasher;
pub use signing::HmacUrlSigner;
pub use tokens::RandomResetTokens;

#[cfg(feature = "auth-jwt")]
pub use jwt::JwtSessions;
