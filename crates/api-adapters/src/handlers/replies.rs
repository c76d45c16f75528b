use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde_json::{json, Value};

use domains::{Reply, ReplyId};
use services::ReplyInput;

use super::{form, parse_id, see_other};
use crate::error::{ApiResult, WithOld};
use crate::extract::{CurrentActor, Input};
use crate::state::AppState;

pub async fn create(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path((category, thread)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    state.services.replies.authorize_create(actor.actor()).await?;
    let detail = state.services.threads.show(&category, &thread).await?;
    let action = format!("{}/replies", detail.thread.path(&category));
    Ok(Json(json!({
        "form": form(&action, "POST"),
        "thread": detail.thread,
    })))
}

pub async fn store(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path((category, thread)): Path<(String, String)>,
    Input(input): Input<ReplyInput>,
) -> ApiResult<Response> {
    let reply = state
        .services
        .replies
        .create(actor.actor(), &category, &thread, &input)
        .await
        .with_old(&input)?;
    Ok(see_other(&reply.path))
}

pub async fn show(
    State(state): State<AppState>,
    Path((category, thread, reply)): Path<(String, String, String)>,
) -> ApiResult<Json<Reply>> {
    let id: ReplyId = parse_id("reply", &reply)?;
    Ok(Json(state.services.replies.show(&category, &thread, id).await?))
}

pub async fn edit(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path((category, thread, reply)): Path<(String, String, String)>,
) -> ApiResult<Json<Value>> {
    let id: ReplyId = parse_id("reply", &reply)?;
    let reply = state
        .services
        .replies
        .edit(actor.actor(), &category, &thread, id)
        .await?;
    Ok(Json(json!({
        "form": form(&reply.path, "PATCH"),
        "reply": reply.resource,
    })))
}

pub async fn update(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path((category, thread, reply)): Path<(String, String, String)>,
    Input(input): Input<ReplyInput>,
) -> ApiResult<Response> {
    let id: ReplyId = parse_id("reply", &reply)?;
    let reply = state
        .services
        .replies
        .update(actor.actor(), &category, &thread, id, &input)
        .await
        .with_old(&input)?;
    Ok(see_other(&reply.path))
}

pub async fn archive(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Json<Reply>> {
    let id: ReplyId = parse_id("reply", &id)?;
    Ok(Json(state.services.replies.soft_delete(actor.actor(), id).await?))
}

pub async fn restore(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Json<Reply>> {
    let id: ReplyId = parse_id("reply", &id)?;
    Ok(Json(state.services.replies.restore(actor.actor(), id).await?))
}

pub async fn destroy(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id: ReplyId = parse_id("reply", &id)?;
    state.services.replies.destroy(actor.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
