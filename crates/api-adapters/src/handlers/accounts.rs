//! Login, registration, email verification and password reset.

use axum::extract::{Path, Query, State};
use axum::http::header::SET_COOKIE;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use domains::DomainError;
use services::{
    Authenticated, ForgotPasswordInput, LoginInput, RegisterInput, ResetPasswordInput,
    VerificationStatus,
};

use super::{form, see_other};
use crate::error::{ApiResult, WithOld};
use crate::extract::{clear_session_cookie, session_cookie, ClientIp, CurrentActor, Input};
use crate::state::AppState;

const HOME: &str = "/home";

fn signed_in(auth: &Authenticated) -> Response {
    (
        [(SET_COOKIE, session_cookie(&auth.session))],
        Redirect::to(HOME),
    )
        .into_response()
}

/// Signed-in users have no business on the guest forms.
fn guest_form(actor: &CurrentActor, action: &str) -> Response {
    if actor.actor().is_some() {
        return see_other(HOME);
    }
    Json(form(action, "POST")).into_response()
}

pub async fn login_form(actor: CurrentActor) -> Response {
    guest_form(&actor, "/login")
}

pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Input(input): Input<LoginInput>,
) -> ApiResult<Response> {
    let auth = state
        .services
        .accounts
        .login(&input, &ip)
        .await
        .with_old(&input)?;
    Ok(signed_in(&auth))
}

pub async fn logout() -> Response {
    ([(SET_COOKIE, clear_session_cookie())], Redirect::to("/")).into_response()
}

pub async fn register_form(actor: CurrentActor) -> Response {
    guest_form(&actor, "/register")
}

pub async fn register(
    State(state): State<AppState>,
    Input(input): Input<RegisterInput>,
) -> ApiResult<Response> {
    let auth = state
        .services
        .accounts
        .register(&input)
        .await
        .with_old(&input)?;
    Ok(signed_in(&auth))
}

// ── Email verification ──────────────────────────────────────────────────────

pub async fn verification_notice(
    State(state): State<AppState>,
    actor: CurrentActor,
) -> ApiResult<Response> {
    match state.services.accounts.verification_notice(actor.actor()).await? {
        VerificationStatus::Pending => Ok(Json(json!({
            "status": VerificationStatus::Pending,
            "form": form("/email/resend", "POST"),
        }))
        .into_response()),
        _ => Ok(see_other(HOME)),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignatureQuery {
    expires: Option<String>,
    signature: Option<String>,
}

pub async fn verify(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path((id, hash)): Path<(String, String)>,
    Query(query): Query<SignatureQuery>,
) -> ApiResult<Response> {
    let invalid = || DomainError::forbidden("invalid verification link");
    let id: i64 = id.parse().map_err(|_| invalid())?;
    let expires: i64 = query
        .expires
        .as_deref()
        .and_then(|e| e.parse().ok())
        .ok_or_else(invalid)?;
    let signature = query.signature.ok_or_else(invalid)?;

    state
        .services
        .accounts
        .verify_email(actor.actor(), id, &hash, expires, &signature)
        .await?;
    Ok(see_other("/home?verified=1"))
}

pub async fn resend(State(state): State<AppState>, actor: CurrentActor) -> ApiResult<Response> {
    match state.services.accounts.resend_verification(actor.actor()).await? {
        VerificationStatus::AlreadyVerified => Ok(see_other(HOME)),
        _ => Ok(Json(json!({ "status": "verification-link-sent" })).into_response()),
    }
}

// ── Password reset ──────────────────────────────────────────────────────────

pub async fn forgot_form() -> Json<Value> {
    Json(form("/password/email", "POST"))
}

pub async fn send_reset_link(
    State(state): State<AppState>,
    Input(input): Input<ForgotPasswordInput>,
) -> ApiResult<Json<Value>> {
    state
        .services
        .accounts
        .send_reset_link(&input)
        .await
        .with_old(&input)?;
    Ok(Json(
        json!({ "status": "We have emailed your password reset link!" }),
    ))
}

pub async fn reset_form(Path(token): Path<String>) -> Json<Value> {
    Json(json!({
        "form": form("/password/reset", "POST"),
        "token": token,
    }))
}

pub async fn reset(
    State(state): State<AppState>,
    Input(input): Input<ResetPasswordInput>,
) -> ApiResult<Response> {
    let auth = state
        .services
        .accounts
        .reset_password(&input)
        .await
        .with_old(&input)?;
    Ok(signed_in(&auth))
}
