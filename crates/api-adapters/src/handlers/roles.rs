use axum::extract::{Path, State};
use axum::Json;

use services::roles::RoleAssignment;
use services::AssignRoleInput;

use crate::error::{ApiResult, WithOld};
use crate::extract::{CurrentActor, Input};
use crate::state::AppState;

/// `POST /admin/users/{user}/roles`
pub async fn assign(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(user): Path<String>,
    Input(input): Input<AssignRoleInput>,
) -> ApiResult<Json<RoleAssignment>> {
    let username = user.strip_prefix('@').unwrap_or(&user);
    let assignment = state
        .services
        .roles
        .assign(actor.actor(), username, &input)
        .await
        .with_old(&input)?;
    Ok(Json(assignment))
}
