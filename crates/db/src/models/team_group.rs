//! Team group model.

use benchbook_core::types::DbId;
use serde::Serialize;
use sqlx::FromRow;

/// A named subset of a team's users, used as a visibility target.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TeamGroup {
    pub id: DbId,
    pub team: DbId,
    pub name: String,
}
