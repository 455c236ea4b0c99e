//! Repository for the `team_groups` table.

use benchbook_core::types::DbId;
use sqlx::PgPool;

use crate::models::team_group::TeamGroup;

/// Lookups for team groups (visibility targets).
pub struct TeamGroupRepo;

impl TeamGroupRepo {
    /// Resolve a group id to its display name. `None` when the group has
    /// been deleted.
    pub async fn resolve_name(pool: &PgPool, id: DbId) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>("SELECT name FROM team_groups WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List the groups of one team, ordered by name.
    pub async fn list_for_team(pool: &PgPool, team: DbId) -> Result<Vec<TeamGroup>, sqlx::Error> {
        sqlx::query_as::<_, TeamGroup>(
            "SELECT id, team, name FROM team_groups WHERE team = $1 ORDER BY name",
        )
        .bind(team)
        .fetch_all(pool)
        .await
    }
}
