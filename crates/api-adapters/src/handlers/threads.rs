use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde_json::{json, Value};

use domains::{Page, Thread, ThreadDetail, ThreadId};
use services::{ThreadFilter, ThreadInput};

use super::{form, parse_id, see_other};
use crate::error::{ApiResult, WithOld};
use crate::extract::{CurrentActor, Input};
use crate::state::AppState;

/// `GET /community/threads?by=&popular=&unanswered=&page=`
pub async fn index(
    State(state): State<AppState>,
    Query(filter): Query<ThreadFilter>,
) -> ApiResult<Json<Page<Thread>>> {
    Ok(Json(state.services.threads.index(None, &filter).await?))
}

/// Same filters, scoped to one category.
pub async fn by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(filter): Query<ThreadFilter>,
) -> ApiResult<Json<Page<Thread>>> {
    Ok(Json(
        state.services.threads.index(Some(&category), &filter).await?,
    ))
}

pub async fn create(State(state): State<AppState>, actor: CurrentActor) -> ApiResult<Json<Value>> {
    state.services.threads.authorize_create(actor.actor()).await?;
    let categories = state.services.categories.index().await?;
    Ok(Json(json!({
        "form": form("/community/threads", "POST"),
        "categories": categories,
    })))
}

pub async fn store(
    State(state): State<AppState>,
    actor: CurrentActor,
    Input(input): Input<ThreadInput>,
) -> ApiResult<Response> {
    let thread = state
        .services
        .threads
        .create(actor.actor(), &input)
        .await
        .with_old(&input)?;
    Ok(see_other(&thread.path))
}

pub async fn show(
    State(state): State<AppState>,
    Path((category, thread)): Path<(String, String)>,
) -> ApiResult<Json<ThreadDetail>> {
    Ok(Json(state.services.threads.show(&category, &thread).await?))
}

pub async fn edit(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path((category, thread)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let thread = state
        .services
        .threads
        .edit(actor.actor(), &category, &thread)
        .await?;
    let categories = state.services.categories.index().await?;
    Ok(Json(json!({
        "form": form(&thread.path(&category), "PATCH"),
        "thread": thread,
        "categories": categories,
    })))
}

pub async fn update(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path((category, thread)): Path<(String, String)>,
    Input(input): Input<ThreadInput>,
) -> ApiResult<Response> {
    let thread = state
        .services
        .threads
        .update(actor.actor(), &category, &thread, &input)
        .await
        .with_old(&input)?;
    Ok(see_other(&thread.path))
}

pub async fn archive(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Json<Thread>> {
    let id: ThreadId = parse_id("thread", &id)?;
    Ok(Json(state.services.threads.soft_delete(actor.actor(), id).await?))
}

pub async fn restore(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Json<Thread>> {
    let id: ThreadId = parse_id("thread", &id)?;
    Ok(Json(state.services.threads.restore(actor.actor(), id).await?))
}

pub async fn destroy(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id: ThreadId = parse_id("thread", &id)?;
    state.services.threads.destroy(actor.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
