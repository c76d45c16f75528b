use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;

use domains::{Profile, ProfileChanges, UserView};

use super::see_other;
use crate::error::{ApiResult, WithOld};
use crate::extract::{CurrentActor, Input};
use crate::state::AppState;

/// Profile URLs are written `/profiles/@name`; the bare name works too.
fn handle(raw: &str) -> &str {
    raw.strip_prefix('@').unwrap_or(raw)
}

pub async fn index(State(state): State<AppState>) -> ApiResult<Json<Vec<Profile>>> {
    Ok(Json(state.services.profiles.index().await?))
}

pub async fn show(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> ApiResult<Json<UserView>> {
    Ok(Json(state.services.profiles.show(handle(&user)).await?))
}

pub async fn update(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(user): Path<String>,
    Input(changes): Input<ProfileChanges>,
) -> ApiResult<Response> {
    let view = state
        .services
        .profiles
        .update(actor.actor(), handle(&user), changes.clone())
        .await
        .with_old(&changes)?;
    Ok(see_other(&view.user.path()))
}
