use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde_json::{json, Value};

use domains::{Category, CategoryId};
use services::CategoryInput;

use super::{form, parse_id, see_other};
use crate::error::{ApiResult, WithOld};
use crate::extract::{CurrentActor, Input};
use crate::state::AppState;

pub async fn index(State(state): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.services.categories.index().await?))
}

pub async fn create(State(state): State<AppState>, actor: CurrentActor) -> ApiResult<Json<Value>> {
    state.services.categories.authorize_create(actor.actor()).await?;
    Ok(Json(form("/community/categories", "POST")))
}

pub async fn store(
    State(state): State<AppState>,
    actor: CurrentActor,
    Input(input): Input<CategoryInput>,
) -> ApiResult<Response> {
    let category = state
        .services
        .categories
        .create(actor.actor(), &input)
        .await
        .with_old(&input)?;
    Ok(see_other(&category.path()))
}

pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<Category>> {
    Ok(Json(state.services.categories.show(&slug).await?))
}

pub async fn edit(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(slug): Path<String>,
) -> ApiResult<Json<Value>> {
    let category = state.services.categories.edit(actor.actor(), &slug).await?;
    Ok(Json(json!({
        "form": form(&category.path(), "PATCH"),
        "category": category,
    })))
}

pub async fn update(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(slug): Path<String>,
    Input(input): Input<CategoryInput>,
) -> ApiResult<Response> {
    let category = state
        .services
        .categories
        .update(actor.actor(), &slug, &input)
        .await
        .with_old(&input)?;
    Ok(see_other(&category.path()))
}

pub async fn archive(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Json<Category>> {
    let id: CategoryId = parse_id("category", &id)?;
    Ok(Json(state.services.categories.soft_delete(actor.actor(), id).await?))
}

pub async fn restore(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Json<Category>> {
    let id: CategoryId = parse_id("category", &id)?;
    Ok(Json(state.services.categories.restore(actor.actor(), id).await?))
}

pub async fn destroy(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id: CategoryId = parse_id("category", &id)?;
    state.services.categories.destroy(actor.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
