//! Tag models.

use benchbook_core::types::DbId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A tag attached to one entity, as returned by tag lookups.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TagLink {
    pub tag_id: DbId,
    pub tag: String,
}

/// DTO for attaching a tag to an entity.
#[derive(Debug, Deserialize)]
pub struct CreateTag {
    pub tag: String,
}
