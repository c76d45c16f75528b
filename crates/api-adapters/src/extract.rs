//! Request extractors: the signed-in actor, the client address, and form or
//! JSON bodies.

use axum::extract::{ConnectInfo, Form, FromRequest, FromRequestParts, Request};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::Json;
use serde::de::DeserializeOwned;
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use domains::{Actor, SessionToken};

use crate::error::ApiError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "agora_session";

/// The actor behind the request's session, if any. Unknown or expired
/// sessions count as guests.
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Option<Actor>);

impl CurrentActor {
    pub fn actor(&self) -> Option<&Actor> {
        self.0.as_ref()
    }
}

impl FromRequestParts<AppState> for CurrentActor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = session_token(&parts.headers) else {
            return Ok(Self(None));
        };
        let actor = state.services.accounts.resolve_session(&token).await?;
        Ok(Self(actor))
    }
}

/// A `Bearer` credential wins over the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value for an issued session. Only "remember me" sessions
/// outlive the browser.
pub fn session_cookie(session: &SessionToken) -> String {
    let mut cookie = format!("{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax", session.token);
    if let Some(max_age) = session.max_age {
        cookie.push_str(&format!("; Max-Age={}", max_age.as_secs()));
    }
    cookie
}

pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Throttle key component for login attempts.
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

impl FromRequestParts<AppState> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        let ip = client_ip(&parts.headers, peer, state.trust_proxy_headers);
        Ok(Self(ip.map_or_else(|| "unknown".to_string(), |ip| ip.to_string())))
    }
}

/// `X-Forwarded-For` (first hop) and `X-Real-IP` are only consulted when the
/// server sits behind a trusted proxy. Otherwise the peer address is used.
pub fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>, trust_proxy_headers: bool) -> Option<IpAddr> {
    if trust_proxy_headers {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|ip| ip.trim().parse().ok());
        if forwarded.is_some() {
            return forwarded;
        }
        let real_ip = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|ip| ip.trim().parse().ok());
        if real_ip.is_some() {
            return real_ip;
        }
    }
    peer
}

/// A JSON or urlencoded body, chosen by `Content-Type`. A request without a
/// body type decodes to `T::default()`.
#[derive(Debug, Clone)]
pub struct Input<T>(pub T);

impl<S, T> FromRequest<S> for Input<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_ascii_lowercase);
        match content_type.as_deref() {
            None => Ok(Self(T::default())),
            Some(ct) if ct.starts_with("application/json") => {
                let Json(value) = Json::<T>::from_request(req, state)
                    .await
                    .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
                Ok(Self(value))
            }
            Some(_) => {
                let Form(value) = Form::<T>::from_request(req, state)
                    .await
                    .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
                Ok(Self(value))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use std::time::Duration;

    #[test]
    fn reads_session_from_cookie_or_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; agora_session=abc"));
        assert_eq!(session_token(&headers).as_deref(), Some("abc"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(session_token(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn empty_cookies_are_guests() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("agora_session="));
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn remember_me_cookies_persist() {
        let session = SessionToken {
            token: "t".into(),
            max_age: Some(Duration::from_secs(60)),
        };
        assert_eq!(
            session_cookie(&session),
            "agora_session=t; Path=/; HttpOnly; SameSite=Lax; Max-Age=60"
        );
        let session = SessionToken {
            token: "t".into(),
            max_age: None,
        };
        assert!(!session_cookie(&session).contains("Max-Age"));
        assert!(clear_session_cookie().ends_with("Max-Age=0"));
    }

    fn forwarded(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn proxy_headers_are_ignored_unless_trusted() {
        let peer: IpAddr = "192.0.2.7".parse().unwrap();
        let headers = forwarded("10.0.0.1, 10.0.0.2");
        assert_eq!(client_ip(&headers, Some(peer), false), Some(peer));
        assert_eq!(client_ip(&headers, None, false), None);
        assert_eq!(
            client_ip(&headers, Some(peer), true),
            Some("10.0.0.1".parse().unwrap())
        );
    }

    #[test]
    fn trusted_proxies_fall_back_to_real_ip_then_peer() {
        let peer: IpAddr = "192.0.2.7".parse().unwrap();
        let mut headers = forwarded("not-an-address");
        assert_eq!(client_ip(&headers, Some(peer), true), Some(peer));

        headers.insert("x-real-ip", HeaderValue::from_static("2001:db8::1"));
        assert_eq!(
            client_ip(&headers, Some(peer), true),
            Some("2001:db8::1".parse().unwrap())
        );
    }
}
