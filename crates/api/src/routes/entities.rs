//! Route definitions for the three entity collections.
//!
//! One router serves `/experiments`, `/templates`, and `/items`; the
//! `{kind}` segment is resolved per request, so unknown collections fall
//! through to a 400 instead of a 404.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::entities;
use crate::state::AppState;

/// Entity routes mounted at the API root.
///
/// ```text
/// GET   /{kind}                      -> list
/// GET   /{kind}/{id}                 -> get_one
/// PATCH /{kind}/{id}                 -> update
/// POST  /{kind}/{id}/lock            -> toggle_lock
/// GET   /{kind}/{id}/permissions     -> permissions
/// PUT   /{kind}/{id}/visibility      -> update_visibility
/// PUT   /{kind}/{id}/category        -> update_category
/// GET   /{kind}/{id}/tags            -> list_tags
/// POST  /{kind}/{id}/tags            -> create_tag
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{kind}", get(entities::list))
        .route(
            "/{kind}/{id}",
            get(entities::get_one).patch(entities::update),
        )
        .route("/{kind}/{id}/lock", post(entities::toggle_lock))
        .route("/{kind}/{id}/permissions", get(entities::permissions))
        .route("/{kind}/{id}/visibility", put(entities::update_visibility))
        .route("/{kind}/{id}/category", put(entities::update_category))
        .route(
            "/{kind}/{id}/tags",
            get(entities::list_tags).post(entities::create_tag),
        )
}
