//! # Agora server
//!
//! Loads settings, installs tracing, wires the adapters selected by
//! configuration into the services and serves the axum router until
//! SIGINT/SIGTERM.

use anyhow::Context;
use secrecy::ExposeSecret;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use api_adapters::{router, AppState};
use auth_adapters::{Argon2Hasher, HmacUrlSigner, JwtSessions, LogNotifier, RandomResetTokens};
use configs::{LogFormat, LogSettings, Settings};
use services::{AccountSettings, AuthPorts, ForumServices, Ports};
use storage_adapters::{MemoryLoginThrottle, MemoryStore};

fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

fn auth_ports(settings: &Settings) -> AuthPorts {
    let auth = &settings.auth;
    AuthPorts {
        hasher: Arc::new(Argon2Hasher::new()),
        sessions: Arc::new(JwtSessions::new(
            auth.jwt_secret.expose_secret().as_bytes(),
            auth.session_ttl(),
            auth.remember_ttl(),
        )),
        signer: Arc::new(HmacUrlSigner::new(auth.signing_key.expose_secret())),
        reset_tokens: Arc::new(RandomResetTokens),
        notifier: Arc::new(LogNotifier),
        throttle: Arc::new(MemoryLoginThrottle::new(
            settings.throttle.max_attempts,
            settings.throttle.window(),
        )),
    }
}

fn account_settings(settings: &Settings) -> AccountSettings {
    AccountSettings {
        verification_ttl: chrono::Duration::minutes(settings.auth.verification_ttl_minutes),
        reset_ttl: chrono::Duration::minutes(settings.auth.reset_ttl_minutes),
        base_url: settings.app.base_url.clone(),
    }
}

#[cfg(feature = "db-postgres")]
async fn storage_ports(settings: &Settings, auth: AuthPorts) -> anyhow::Result<Ports> {
    use sqlx::postgres::PgPoolOptions;
    use storage_adapters::PgStore;

    let Some(url) = &settings.database.url else {
        tracing::warn!("database.url not set; using the in-memory store");
        return Ok(Ports::from_store(Arc::new(MemoryStore::new()), auth));
    };
    let pool = PgPoolOptions::new()
        .max_connections(settings.database.max_connections)
        .connect(url.expose_secret())
        .await
        .context("failed to connect to Postgres")?;
    let store = PgStore::new(pool);
    if settings.database.run_migrations {
        store.migrate().await.context("failed to run migrations")?;
        tracing::info!("migrations applied");
    }
    Ok(Ports::from_store(Arc::new(store), auth))
}

#[cfg(not(feature = "db-postgres"))]
async fn storage_ports(settings: &Settings, auth: AuthPorts) -> anyhow::Result<Ports> {
    if settings.database.url.is_some() {
        anyhow::bail!("database.url is set but this build lacks the db-postgres feature");
    }
    tracing::warn!("running on the in-memory store");
    Ok(Ports::from_store(Arc::new(MemoryStore::new()), auth))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => tracing::error!(error = %err, "failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load settings")?;
    init_tracing(&settings.log);

    let ports = storage_ports(&settings, auth_ports(&settings)).await?;
    let services = ForumServices::new(ports, account_settings(&settings));
    services
        .roles
        .install_defaults()
        .await
        .context("failed to install default roles")?;

    let state = AppState::new(services, &settings.app.name)
        .trusting_proxy_headers(settings.server.trust_proxy_headers);
    let app = router(state);

    let addr = settings.server.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, app = %settings.app.name, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    Ok(())
}
