//! # configs
//!
//! Layered settings. Sources, lowest precedence first:
//!
//! 1. `config/default.toml` (compiled in, so the binary runs from any cwd)
//! 2. `config/default.toml` on disk, if present
//! 3. `config/{AGORA_ENV}.toml`, if present
//! 4. `AGORA__SECTION__KEY` environment variables (after loading `.env`)

use config::{Config, Environment, File, FileFormat, Map};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const DEFAULTS: &str = include_str!("../../../config/default.toml");
const ENV_PREFIX: &str = "AGORA";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub throttle: ThrottleSettings,
    pub app: AppSettings,
    pub log: LogSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Only enable behind a reverse proxy that overwrites `X-Forwarded-For`.
    #[serde(default)]
    pub trust_proxy_headers: bool,
}

impl ServerSettings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    /// `None` selects the in-memory store.
    pub url: Option<SecretString>,
    pub max_connections: u32,
    pub run_migrations: bool,
}

#[derive(Debug, Deserialize)]
pub struct AuthSettings {
    pub jwt_secret: SecretString,
    pub signing_key: SecretString,
    pub session_ttl_minutes: u64,
    pub remember_ttl_days: u64,
    pub verification_ttl_minutes: i64,
    pub reset_ttl_minutes: i64,
}

impl AuthSettings {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_minutes * 60)
    }

    pub fn remember_ttl(&self) -> Duration {
        Duration::from_secs(self.remember_ttl_days * 24 * 60 * 60)
    }
}

#[derive(Debug, Deserialize)]
pub struct ThrottleSettings {
    pub max_attempts: u32,
    pub window_seconds: u64,
}

impl ThrottleSettings {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

#[derive(Debug, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Deserialize)]
pub struct LogSettings {
    pub filter: String,
    pub format: LogFormat,
}

impl Settings {
    /// Loads `.env`, then every layer for the environment named by `AGORA_ENV`.
    pub fn load() -> Result<Self, SettingsError> {
        let _ = dotenvy::dotenv();
        let env = std::env::var("AGORA_ENV").ok();
        Self::build(env.as_deref(), None)
    }

    /// `env_vars` replaces the process environment when given.
    pub fn build(env: Option<&str>, env_vars: Option<Map<String, String>>) -> Result<Self, SettingsError> {
        let mut builder = Config::builder()
            .add_source(File::from_str(DEFAULTS, FileFormat::Toml))
            .add_source(File::with_name("config/default").required(false));
        if let Some(env) = env {
            builder = builder.add_source(File::with_name(&format!("config/{env}")).required(false));
        }
        let settings: Settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(env_vars),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.auth.jwt_secret.expose_secret().is_empty() {
            return Err(SettingsError::Invalid("auth.jwt_secret must not be empty".into()));
        }
        if self.auth.signing_key.expose_secret().is_empty() {
            return Err(SettingsError::Invalid("auth.signing_key must not be empty".into()));
        }
        if self.throttle.max_attempts == 0 {
            return Err(SettingsError::Invalid("throttle.max_attempts must be at least 1".into()));
        }
        if self.auth.jwt_secret.expose_secret().starts_with("change-me") {
            tracing::warn!("auth.jwt_secret is still the default value");
        }
        Ok(())
    }
}
