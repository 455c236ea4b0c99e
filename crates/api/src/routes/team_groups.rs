//! Route definitions for the `/team_groups` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::team_groups;
use crate::state::AppState;

/// Routes mounted at `/team_groups`.
///
/// ```text
/// GET /    -> list
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(team_groups::list))
}
