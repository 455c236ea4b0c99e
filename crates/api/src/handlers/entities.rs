//! Handlers for the entity resources (`/experiments`, `/templates`, `/items`).
//!
//! Every handler resolves the `{kind}` path segment to an [`EntityKind`] and
//! defers access control to the permission engine; the HTTP layer never
//! re-implements the rules.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use benchbook_core::entity::EntityKind;
use benchbook_core::error::CoreError;
use benchbook_core::lock::LockState;
use benchbook_core::permissions::evaluate;
use benchbook_core::types::{DbId, Timestamp};
use benchbook_db::models::entity::{EntityListing, EntityRow, UpdateEntity};
use benchbook_db::models::tag::{CreateTag, TagLink};
use benchbook_db::repositories::{EntityRepo, TagRepo};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::EntityListParams;
use crate::state::AppState;

/// Detail view of a single entity: the row, its tags, and the resolved
/// visibility label.
#[derive(Debug, Serialize)]
pub struct EntityDetail {
    #[serde(flatten)]
    pub entity: EntityRow,
    pub tags: Vec<TagLink>,
    pub visibility_label: String,
    pub read_only: bool,
}

/// Lock state response.
#[derive(Debug, Serialize)]
pub struct LockResponse {
    pub locked: bool,
    pub lockedby: Option<DbId>,
    pub lockedwhen: Option<Timestamp>,
}

impl From<LockState> for LockResponse {
    fn from(state: LockState) -> Self {
        LockResponse {
            locked: state.locked,
            lockedby: state.locked_by,
            lockedwhen: state.locked_at,
        }
    }
}

/// Request body for `PUT .../visibility`.
#[derive(Debug, Deserialize)]
pub struct UpdateVisibility {
    pub visibility: String,
}

/// Request body for `PUT .../category`.
#[derive(Debug, Deserialize)]
pub struct UpdateCategory {
    pub category: DbId,
}

/// GET /api/v1/{kind}
///
/// Filtered, paginated listing of entities readable by the requester.
pub async fn list(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(kind): Path<String>,
    Query(params): Query<EntityListParams>,
) -> AppResult<Json<Vec<EntityListing>>> {
    let kind = EntityKind::from_path(&kind)?;
    let include_tags = params.tags;
    let filters = params.into_filters()?;
    let rows = EntityRepo::list(&state.pool, &actor, kind, &filters, include_tags).await?;
    Ok(Json(rows))
}

/// GET /api/v1/{kind}/{id}
///
/// Single entity with tags and visibility label. An entity the requester
/// cannot read is indistinguishable from one that does not exist.
pub async fn get_one(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path((kind, id)): Path<(String, DbId)>,
) -> AppResult<Json<EntityDetail>> {
    let kind = EntityKind::from_path(&kind)?;
    let entity = EntityRepo::find(&state.pool, kind, id)
        .await?
        .ok_or_else(no_rights)?;

    let access = evaluate(&actor, kind, &entity.record());
    if !access.read {
        return Err(no_rights());
    }

    let tags = EntityRepo::get_tags(&state.pool, kind, id).await?;
    let visibility_label = EntityRepo::resolve_visibility(&state.pool, &entity.visibility).await?;

    Ok(Json(EntityDetail {
        entity,
        tags,
        visibility_label,
        read_only: !access.write,
    }))
}

/// GET /api/v1/{kind}/{id}/permissions
///
/// The requester's `{read, write}` on one entity.
pub async fn permissions(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path((kind, id)): Path<(String, DbId)>,
) -> AppResult<Json<serde_json::Value>> {
    let kind = EntityKind::from_path(&kind)?;
    let access = EntityRepo::check_permission(&state.pool, &actor, kind, id).await?;
    Ok(Json(serde_json::json!({
        "read": access.read,
        "write": access.write,
    })))
}

/// POST /api/v1/{kind}/{id}/lock
///
/// Toggle the lock. A no-op for templates.
pub async fn toggle_lock(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path((kind, id)): Path<(String, DbId)>,
) -> AppResult<Json<LockResponse>> {
    let kind = EntityKind::from_path(&kind)?;
    let lock_state = EntityRepo::toggle_lock(&state.pool, &actor, kind, id).await?;
    Ok(Json(lock_state.into()))
}

/// PATCH /api/v1/{kind}/{id}
///
/// Update title, date, and body. Snapshots a revision first.
pub async fn update(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path((kind, id)): Path<(String, DbId)>,
    Json(input): Json<UpdateEntity>,
) -> AppResult<StatusCode> {
    let kind = EntityKind::from_path(&kind)?;
    EntityRepo::update(&state.pool, &actor, kind, id, &input).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/{kind}/{id}/visibility
pub async fn update_visibility(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path((kind, id)): Path<(String, DbId)>,
    Json(input): Json<UpdateVisibility>,
) -> AppResult<StatusCode> {
    let kind = EntityKind::from_path(&kind)?;
    EntityRepo::update_visibility(&state.pool, &actor, kind, id, &input.visibility).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/{kind}/{id}/category
pub async fn update_category(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path((kind, id)): Path<(String, DbId)>,
    Json(input): Json<UpdateCategory>,
) -> AppResult<StatusCode> {
    let kind = EntityKind::from_path(&kind)?;
    EntityRepo::update_category(&state.pool, &actor, kind, id, input.category).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/{kind}/{id}/tags
pub async fn list_tags(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path((kind, id)): Path<(String, DbId)>,
) -> AppResult<Json<Vec<TagLink>>> {
    let kind = EntityKind::from_path(&kind)?;
    let access = EntityRepo::check_permission(&state.pool, &actor, kind, id).await?;
    if !access.read {
        return Err(no_rights());
    }
    let tags = EntityRepo::get_tags(&state.pool, kind, id).await?;
    Ok(Json(tags))
}

/// POST /api/v1/{kind}/{id}/tags
pub async fn create_tag(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path((kind, id)): Path<(String, DbId)>,
    Json(input): Json<CreateTag>,
) -> AppResult<StatusCode> {
    let kind = EntityKind::from_path(&kind)?;
    let tag = input.tag.trim();
    if tag.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Tag must not be empty".into(),
        )));
    }
    let access = EntityRepo::check_permission(&state.pool, &actor, kind, id).await?;
    if !access.write {
        return Err(no_rights());
    }
    TagRepo::create(&state.pool, actor.team_id, kind, id, tag).await?;
    Ok(StatusCode::CREATED)
}

fn no_rights() -> AppError {
    AppError::Core(CoreError::Forbidden(
        "You don't have the rights to do this.".to_string(),
    ))
}
