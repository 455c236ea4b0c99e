pub mod auth;
pub mod entities;
pub mod health;
pub mod team_groups;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/...                    login, current user
/// /team_groups                 visibility targets of the requester's team
/// /{kind}/...                  experiments, templates, items
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Authentication routes (login, current user).
        .nest("/auth", auth::router())
        // Team groups; the static segment wins over the `{kind}` capture.
        .nest("/team_groups", team_groups::router())
        // Entity routes, one tree for all three collections.
        .merge(entities::router())
}
