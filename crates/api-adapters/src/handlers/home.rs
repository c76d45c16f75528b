use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use domains::DomainError;

use crate::error::{ApiError, ApiResult};
use crate::extract::CurrentActor;
use crate::state::AppState;

pub async fn welcome(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "app": &*state.app_name }))
}

pub async fn home(State(state): State<AppState>, actor: CurrentActor) -> ApiResult<Json<Value>> {
    let user = state.services.accounts.current_user(actor.actor()).await?;
    Ok(Json(json!({ "user": user })))
}

pub async fn metrics(State(state): State<AppState>) -> ApiResult<Response> {
    let body = state
        .metrics
        .render()
        .map_err(|err| ApiError::from(DomainError::internal(err)))?;
    Ok((
        [(
            CONTENT_TYPE,
            "application/openmetrics-text; version=1.0.0; charset=utf-8",
        )],
        body,
    )
        .into_response())
}
