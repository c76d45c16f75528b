//! HS256 JWT session tokens.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use domains::{DomainError, DomainResult, SessionToken, SessionTokens, UserId};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: i64,
    iat: i64,
    exp: i64,
    /// Set for "remember me" sessions.
    #[serde(default)]
    remember: bool,
}

pub struct JwtSessions {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    session_ttl: Duration,
    remember_ttl: Duration,
}

impl JwtSessions {
    pub fn new(secret: &[u8], session_ttl: Duration, remember_ttl: Duration) -> Self {
        let mut validation = Validation::default();
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            session_ttl,
            remember_ttl,
        }
    }
}

impl SessionTokens for JwtSessions {
    fn issue(&self, user: UserId, remember: bool) -> DomainResult<SessionToken> {
        let ttl = if remember {
            self.remember_ttl
        } else {
            self.session_ttl
        };
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.0,
            iat: now,
            exp: now + ttl.as_secs() as i64,
            remember,
        };
        let token =
            encode(&Header::default(), &claims, &self.encoding).map_err(DomainError::internal)?;
        Ok(SessionToken {
            token,
            max_age: remember.then_some(ttl),
        })
    }

    fn verify(&self, token: &str) -> Option<UserId> {
        match decode::<Claims>(token, &self.decoding, &self.validation) {
            Ok(data) => Some(UserId(data.claims.sub)),
            Err(err) => {
                tracing::debug!(error = %err, "rejected session token");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sessions() -> JwtSessions {
        JwtSessions::new(
            b"test-secret",
            Duration::from_secs(2 * 60 * 60),
            Duration::from_secs(30 * 24 * 60 * 60),
        )
    }

    #[test]
    fn issued_tokens_resolve_to_their_user() {
        let sessions = sessions();
        let issued = sessions.issue(UserId(7), false).unwrap();
        assert_eq!(issued.max_age, None);
        assert_eq!(sessions.verify(&issued.token), Some(UserId(7)));
    }

    #[test]
    fn remember_me_sets_max_age() {
        let issued = sessions().issue(UserId(7), true).unwrap();
        assert_eq!(issued.max_age, Some(Duration::from_secs(30 * 24 * 60 * 60)));
    }

    #[test]
    fn foreign_and_malformed_tokens_are_rejected() {
        let other = JwtSessions::new(b"other", Duration::from_secs(60), Duration::from_secs(60));
        let token = other.issue(UserId(1), false).unwrap().token;
        assert_eq!(sessions().verify(&token), None);
        assert_eq!(sessions().verify("not.a.jwt"), None);
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let sessions = sessions();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: 1,
            iat: now - 120,
            exp: now - 60,
            remember: false,
        };
        let token = encode(&Header::default(), &claims, &sessions.encoding).unwrap();
        assert_eq!(sessions.verify(&token), None);
    }
}
