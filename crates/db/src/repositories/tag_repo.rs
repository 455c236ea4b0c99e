//! Repository for the `tags` and `tags2entity` tables.

use benchbook_core::entity::EntityKind;
use benchbook_core::types::DbId;
use sqlx::PgPool;

use crate::models::tag::TagLink;

/// Tag creation and lookup for entities.
pub struct TagRepo;

impl TagRepo {
    /// Attach a tag to an entity, creating the team tag if it does not
    /// exist yet. Returns the tag id.
    pub async fn create(
        pool: &PgPool,
        team: DbId,
        kind: EntityKind,
        entity_id: DbId,
        tag: &str,
    ) -> Result<DbId, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let tag_id = sqlx::query_scalar::<_, DbId>(
            "INSERT INTO tags (team, tag) VALUES ($1, $2) \
             ON CONFLICT (team, tag) DO UPDATE SET tag = EXCLUDED.tag \
             RETURNING id",
        )
        .bind(team)
        .bind(tag)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO tags2entity (item_id, tag_id, item_type) VALUES ($1, $2, $3) \
             ON CONFLICT DO NOTHING",
        )
        .bind(entity_id)
        .bind(tag_id)
        .bind(kind.table())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(tag_id)
    }

    /// List the tags of one entity, deduplicated, ordered by ascending
    /// tag id.
    pub async fn list_for(
        pool: &PgPool,
        kind: EntityKind,
        entity_id: DbId,
    ) -> Result<Vec<TagLink>, sqlx::Error> {
        sqlx::query_as::<_, TagLink>(
            "SELECT DISTINCT tags2entity.tag_id, tags.tag FROM tags2entity \
             LEFT JOIN tags ON tags.id = tags2entity.tag_id \
             WHERE tags2entity.item_id = $1 AND tags2entity.item_type = $2 \
             ORDER BY tags2entity.tag_id",
        )
        .bind(entity_id)
        .bind(kind.table())
        .fetch_all(pool)
        .await
    }
}
