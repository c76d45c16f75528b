//! # Accounts
//!
//! Registration, credential login with throttling, session resolution,
//! email verification through signed links, and password reset.

use chrono::{Duration, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::instrument;

use domains::{
    Actor, DomainError, DomainResult, LoginThrottle, NewUser, Notification, Notifier,
    PasswordHasher, PasswordResetRecord, PasswordResetRepository, ResetTokens, SessionToken,
    SessionTokens, UrlSigner, User, UserId, UserRepository, ValidationErrors,
};

use crate::policy::Policy;
use crate::validation::{Validator, MIN_PASSWORD_LEN};
use crate::{Checkbox, Ports};

pub const FAILED_LOGIN: &str = "These credentials do not match our records.";
pub const UNKNOWN_EMAIL: &str = "We can't find a user with that email address.";
pub const INVALID_RESET_TOKEN: &str = "This password reset token is invalid.";

#[derive(Debug, Clone)]
pub struct AccountSettings {
    /// Lifetime of signed email verification links.
    pub verification_ttl: Duration,
    /// Lifetime of password reset tokens.
    pub reset_ttl: Duration,
    /// Prefix for links sent by email, e.g. `https://forum.example.com`.
    pub base_url: String,
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            verification_ttl: Duration::minutes(60),
            reset_ttl: Duration::minutes(60),
            base_url: "http://localhost:8080".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// A verification link is outstanding.
    Pending,
    Verified,
    AlreadyVerified,
}

/// A signed-in user and the session credential to hand back to them.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub user: User,
    pub session: SessionToken,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RegisterInput {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
}

/// `identity` is an email address when it contains `@`, otherwise a username.
/// It serializes under that field name so echoed input refills the right box.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginInput {
    #[serde(alias = "email", alias = "username")]
    pub identity: Option<String>,
    pub password: Option<String>,
    pub remember: Option<Checkbox>,
}

impl LoginInput {
    /// Field that login failures are reported against.
    pub fn identity_field(&self) -> &'static str {
        match &self.identity {
            Some(identity) if identity.contains('@') => "email",
            _ => "username",
        }
    }
}

impl Serialize for LoginInput {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry(self.identity_field(), &self.identity)?;
        map.serialize_entry("password", &self.password)?;
        map.serialize_entry("remember", &self.remember)?;
        map.end()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ForgotPasswordInput {
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ResetPasswordInput {
    pub token: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
}

/// Hex SHA-256 of the address, embedded in verification links.
pub fn email_hash(email: &str) -> String {
    hex::encode(Sha256::digest(email.as_bytes()))
}

pub fn verification_path(id: UserId, hash: &str) -> String {
    format!("/email/verify/{id}/{hash}")
}

fn is_alpha_dash_dot(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

pub struct AccountService {
    users: Arc<dyn UserRepository>,
    resets: Arc<dyn PasswordResetRepository>,
    hasher: Arc<dyn PasswordHasher>,
    sessions: Arc<dyn SessionTokens>,
    signer: Arc<dyn UrlSigner>,
    reset_tokens: Arc<dyn ResetTokens>,
    notifier: Arc<dyn Notifier>,
    throttle: Arc<dyn LoginThrottle>,
    settings: AccountSettings,
}

impl AccountService {
    pub fn new(ports: &Ports, settings: AccountSettings) -> Self {
        Self {
            users: ports.users.clone(),
            resets: ports.password_resets.clone(),
            hasher: ports.hasher.clone(),
            sessions: ports.sessions.clone(),
            signer: ports.signer.clone(),
            reset_tokens: ports.reset_tokens.clone(),
            notifier: ports.notifier.clone(),
            throttle: ports.throttle.clone(),
            settings,
        }
    }

    // ── Registration ────────────────────────────────────────────────────────

    #[instrument(skip(self, input), fields(username = ?input.username))]
    pub async fn register(&self, input: &RegisterInput) -> DomainResult<Authenticated> {
        let mut v = Validator::new();

        let username = v.required("username", input.username.as_deref());
        if let Some(name) = username {
            if !is_alpha_dash_dot(name) {
                v.fail(
                    "username",
                    "The username may only contain letters, numbers, dashes, underscores and periods.",
                );
            }
        }
        v.max_len("username", username, 255);

        let email = v.required("email", input.email.as_deref());
        v.email("email", email);
        v.max_len("email", email, 255);

        let password = v.present("password", input.password.as_deref());
        v.min_len("password", password, MIN_PASSWORD_LEN);
        v.confirmed("password", password, input.password_confirmation.as_deref());

        if let Some(name) = username {
            if self.users.find_by_username(name).await?.is_some() {
                v.taken("username");
            }
        }
        if let Some(address) = email {
            if self.users.find_by_email(address).await?.is_some() {
                v.taken("email");
            }
        }

        v.finish()?;
        let (Some(username), Some(email), Some(password)) = (username, email, password) else {
            return Err(DomainError::internal("registration fields missing after validation"));
        };

        let user = self
            .users
            .create(NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password_hash: self.hasher.hash(password)?,
            })
            .await
            .map_err(|e| match e {
                DomainError::Conflict(field) => DomainError::Validation(ValidationErrors::single(
                    &field,
                    format!("The {field} has already been taken."),
                )),
                other => other,
            })?;
        tracing::info!(user = %user.id, username = %user.username, "user registered");

        self.send_verification(&user).await?;
        let session = self.sessions.issue(user.id, false)?;
        Ok(Authenticated { user, session })
    }

    // ── Sessions ────────────────────────────────────────────────────────────

    /// `client` identifies the caller (usually its IP) for throttling.
    #[instrument(skip(self, input), fields(identity = ?input.identity))]
    pub async fn login(&self, input: &LoginInput, client: &str) -> DomainResult<Authenticated> {
        let field = input.identity_field();
        let mut v = Validator::new();
        let identity = v.required(field, input.identity.as_deref());
        let password = v.present("password", input.password.as_deref());
        v.finish()?;
        let (Some(identity), Some(password)) = (identity, password) else {
            return Err(DomainError::internal("login fields missing after validation"));
        };

        let key = format!("{}|{}", identity.to_lowercase(), client);
        if let Some(wait) = self.throttle.too_many_attempts(&key).await {
            tracing::warn!(client, "login throttled");
            return Err(ValidationErrors::single(
                field,
                format!(
                    "Too many login attempts. Please try again in {} seconds.",
                    wait.as_secs().max(1)
                ),
            )
            .into());
        }

        let user = if field == "email" {
            self.users.find_by_email(identity).await?
        } else {
            self.users.find_by_username(identity).await?
        };
        let user = match user {
            Some(user) if self.hasher.verify(password, &user.password_hash) => user,
            _ => {
                self.throttle.hit(&key).await;
                tracing::info!(client, "failed login");
                return Err(ValidationErrors::single(field, FAILED_LOGIN).into());
            }
        };

        self.throttle.clear(&key).await;
        let remember = input.remember.as_ref().is_some_and(Checkbox::is_checked);
        let session = self.sessions.issue(user.id, remember)?;
        tracing::info!(user = %user.id, remember, "user logged in");
        Ok(Authenticated { user, session })
    }

    /// Resolves a session credential to the actor it belongs to.
    pub async fn resolve_session(&self, token: &str) -> DomainResult<Option<Actor>> {
        let Some(id) = self.sessions.verify(token) else {
            return Ok(None);
        };
        Ok(self.users.find_by_id(id).await?.map(|user| Actor {
            id: user.id,
            email_verified: user.has_verified_email(),
            username: user.username,
        }))
    }

    pub async fn current_user(&self, actor: Option<&Actor>) -> DomainResult<User> {
        let actor = Policy::authenticated(actor)?;
        self.users
            .find_by_id(actor.id)
            .await?
            .ok_or(DomainError::Unauthenticated)
    }

    // ── Email verification ──────────────────────────────────────────────────

    pub fn verification_url(&self, user: &User) -> String {
        let path = verification_path(user.id, &email_hash(&user.email));
        let signed = self
            .signer
            .sign(&path, Utc::now() + self.settings.verification_ttl);
        format!("{}{}", self.settings.base_url.trim_end_matches('/'), signed)
    }

    async fn send_verification(&self, user: &User) -> DomainResult<()> {
        let url = self.verification_url(user);
        self.notifier
            .notify(user, Notification::VerifyEmail { url })
            .await
    }

    pub async fn verification_notice(&self, actor: Option<&Actor>) -> DomainResult<VerificationStatus> {
        let user = self.current_user(actor).await?;
        Ok(if user.has_verified_email() {
            VerificationStatus::AlreadyVerified
        } else {
            VerificationStatus::Pending
        })
    }

    #[instrument(skip(self, actor))]
    pub async fn resend_verification(&self, actor: Option<&Actor>) -> DomainResult<VerificationStatus> {
        let user = self.current_user(actor).await?;
        if user.has_verified_email() {
            return Ok(VerificationStatus::AlreadyVerified);
        }
        self.send_verification(&user).await?;
        Ok(VerificationStatus::Pending)
    }

    /// Checks the link signature, that it was issued to the signed-in user,
    /// and that the address has not changed since.
    #[instrument(skip(self, actor, hash, signature))]
    pub async fn verify_email(
        &self,
        actor: Option<&Actor>,
        id: i64,
        hash: &str,
        expires: i64,
        signature: &str,
    ) -> DomainResult<VerificationStatus> {
        let user = self.current_user(actor).await?;

        let path = verification_path(UserId(id), hash);
        if !self.signer.verify(&path, expires, signature) {
            return Err(DomainError::forbidden("invalid signature"));
        }
        if user.id != UserId(id) || email_hash(&user.email) != hash {
            return Err(DomainError::forbidden("verification link does not match"));
        }
        if user.has_verified_email() {
            return Ok(VerificationStatus::AlreadyVerified);
        }

        self.users.mark_email_verified(user.id, Utc::now()).await?;
        tracing::info!(user = %user.id, "email verified");
        Ok(VerificationStatus::Verified)
    }

    // ── Password reset ──────────────────────────────────────────────────────

    #[instrument(skip(self, input))]
    pub async fn send_reset_link(&self, input: &ForgotPasswordInput) -> DomainResult<()> {
        let mut v = Validator::new();
        let email = v.required("email", input.email.as_deref());
        v.email("email", email);
        v.finish()?;
        let Some(email) = email else {
            return Err(DomainError::internal("email missing after validation"));
        };

        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| ValidationErrors::single("email", UNKNOWN_EMAIL))?;

        let token = self.reset_tokens.generate();
        self.resets
            .put(PasswordResetRecord {
                email: user.email.clone(),
                token_hash: self.reset_tokens.digest(&token),
                created_at: Utc::now(),
            })
            .await?;
        self.notifier
            .notify(&user, Notification::ResetPassword { token })
            .await?;
        tracing::info!(user = %user.id, "password reset link sent");
        Ok(())
    }

    #[instrument(skip(self, input))]
    pub async fn reset_password(&self, input: &ResetPasswordInput) -> DomainResult<Authenticated> {
        let mut v = Validator::new();
        let token = v.required("token", input.token.as_deref());
        let email = v.required("email", input.email.as_deref());
        v.email("email", email);
        let password = v.present("password", input.password.as_deref());
        v.min_len("password", password, MIN_PASSWORD_LEN);
        v.confirmed("password", password, input.password_confirmation.as_deref());
        v.finish()?;
        let (Some(token), Some(email), Some(password)) = (token, email, password) else {
            return Err(DomainError::internal("reset fields missing after validation"));
        };

        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| ValidationErrors::single("email", UNKNOWN_EMAIL))?;

        let valid = match self.resets.find(&user.email).await? {
            Some(record) => {
                record.token_hash == self.reset_tokens.digest(token)
                    && Utc::now() - record.created_at < self.settings.reset_ttl
            }
            None => false,
        };
        if !valid {
            return Err(ValidationErrors::single("email", INVALID_RESET_TOKEN).into());
        }

        let hash = self.hasher.hash(password)?;
        self.users.update_password(user.id, &hash).await?;
        self.resets.delete(&user.email).await?;
        tracing::info!(user = %user.id, "password reset");

        let session = self.sessions.issue(user.id, false)?;
        Ok(Authenticated { user, session })
    }
}
