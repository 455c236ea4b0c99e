//! Handler for the `/team_groups` resource.

use axum::extract::State;
use axum::Json;
use benchbook_db::models::team_group::TeamGroup;
use benchbook_db::repositories::TeamGroupRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// GET /api/v1/team_groups
///
/// The groups of the requester's team, the valid targets for group-scoped
/// visibility.
pub async fn list(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> AppResult<Json<Vec<TeamGroup>>> {
    let groups = TeamGroupRepo::list_for_team(&state.pool, actor.team_id).await?;
    Ok(Json(groups))
}
