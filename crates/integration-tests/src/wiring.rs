//! The production adapter set over an in-memory store, tuned for tests.

use std::sync::Arc;
use std::time::Duration;

use auth_adapters::{Argon2Hasher, HmacUrlSigner, JwtSessions, RandomResetTokens};
use services::{AccountSettings, AuthPorts, ForumServices, Ports};
use storage_adapters::{MemoryLoginThrottle, MemoryStore};

use crate::outbox::Outbox;

pub const BASE_URL: &str = "http://forum.test";
pub const MAX_LOGIN_ATTEMPTS: u32 = 5;

pub fn auth_ports(outbox: Arc<Outbox>) -> AuthPorts {
    AuthPorts {
        // Minimum-cost argon2id keeps registration cheap in tests.
        hasher: Arc::new(Argon2Hasher::with_cost(64, 1).expect("valid argon2 cost")),
        sessions: Arc::new(JwtSessions::new(
            b"integration-jwt-secret",
            Duration::from_secs(2 * 60 * 60),
            Duration::from_secs(30 * 24 * 60 * 60),
        )),
        signer: Arc::new(HmacUrlSigner::new("integration-signing-key")),
        reset_tokens: Arc::new(RandomResetTokens),
        notifier: outbox,
        throttle: Arc::new(MemoryLoginThrottle::new(
            MAX_LOGIN_ATTEMPTS,
            Duration::from_secs(60),
        )),
    }
}

/// Services over `store` with default roles installed.
pub async fn forum_services(store: Arc<MemoryStore>, outbox: Arc<Outbox>) -> ForumServices {
    let services = ForumServices::new(
        Ports::from_store(store, auth_ports(outbox)),
        AccountSettings {
            base_url: BASE_URL.into(),
            ..AccountSettings::default()
        },
    );
    services
        .roles
        .install_defaults()
        .await
        .expect("default roles install");
    services
}
