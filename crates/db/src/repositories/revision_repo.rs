//! Repository for the `revisions` table.
//!
//! A revision snapshots an entity's previous body, written inside the same
//! transaction as the update that replaces it.

use benchbook_core::entity::EntityKind;
use benchbook_core::types::DbId;
use sqlx::postgres::PgExecutor;

/// Body snapshots taken before updates.
pub struct RevisionRepo;

impl RevisionRepo {
    /// Record the current body of an entity before it is overwritten.
    pub async fn create(
        executor: impl PgExecutor<'_>,
        kind: EntityKind,
        entity_id: DbId,
        userid: DbId,
        body: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO revisions (item_id, item_type, userid, body) VALUES ($1, $2, $3, $4)",
        )
        .bind(entity_id)
        .bind(kind.table())
        .bind(userid)
        .bind(body)
        .execute(executor)
        .await?;
        Ok(())
    }
}
