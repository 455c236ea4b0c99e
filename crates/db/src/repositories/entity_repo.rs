//! The entity reader and lock coordinator.
//!
//! Listing queries join owner name, category metadata, attachment and
//! comment aggregates, and optionally tags, then run every fetched row
//! through the permission engine. The SQL WHERE clause narrows; the
//! permission engine decides.

use benchbook_core::entity::{Actor, EntityKind};
use benchbook_core::error::CoreError;
use benchbook_core::filter;
use benchbook_core::lock::{apply_toggle, check_toggle, LockDenial, LockState, ToggleOutcome};
use benchbook_core::permissions::{evaluate, Access};
use benchbook_core::types::{DbId, Timestamp};
use benchbook_core::visibility::Visibility;
use sqlx::{FromRow, PgPool};

use crate::models::entity::{EntityListing, EntityRow, ListFilters, OrderBy, UpdateEntity};
use crate::models::tag::TagLink;
use crate::repositories::entity_filter::{bind_values, build_conditions, BindValue};
use crate::repositories::{RevisionRepo, TagRepo, TeamGroupRepo, UserRepo};
use crate::DbError;

/// Raw rows fetched per batch are a multiple of the requested visible rows,
/// since unreadable rows get dropped after the fetch.
const OVERFETCH_FACTOR: i64 = 2;

#[derive(Debug, FromRow)]
struct LockRow {
    locked: bool,
    lockedby: Option<DbId>,
    lockedwhen: Option<Timestamp>,
}

impl From<LockRow> for LockState {
    fn from(row: LockRow) -> Self {
        LockState {
            locked: row.locked,
            locked_by: row.lockedby,
            locked_at: row.lockedwhen,
        }
    }
}

/// Read, permission-check, lock, and update operations over the three
/// entity tables.
pub struct EntityRepo;

impl EntityRepo {
    /// List entities of one kind, filtered and permission-checked.
    ///
    /// Returns up to `filters.limit()` rows readable by `actor`, always as a
    /// sequence -- an id-filtered lookup yields a vec of length 0 or 1.
    /// Without an id filter, results are scoped to the actor's team; with
    /// one, team scoping is bypassed and the permission check alone decides.
    ///
    /// Unreadable rows are dropped silently. To keep the "N visible rows"
    /// contract exact despite that, raw rows are fetched in over-sized
    /// batches until enough readable ones accumulate or a short batch
    /// signals the source is exhausted.
    pub async fn list(
        pool: &PgPool,
        actor: &Actor,
        kind: EntityKind,
        filters: &ListFilters,
        include_tags: bool,
    ) -> Result<Vec<EntityListing>, sqlx::Error> {
        let (query, binds) = listing_sql(kind, include_tags, filters, actor.team_id);
        let limit = filters.limit();
        let batch = limit * OVERFETCH_FACTOR;
        let mut offset = filters.offset();
        let mut visible: Vec<EntityListing> = Vec::with_capacity(limit as usize);

        loop {
            let rows = bind_values(sqlx::query_as::<_, EntityListing>(&query), &binds)
                .bind(batch)
                .bind(offset)
                .fetch_all(pool)
                .await?;
            let fetched = rows.len() as i64;

            let full = absorb_visible(&mut visible, rows, limit as usize, |row| {
                evaluate(actor, kind, &row.record()).read
            });

            if full || fetched < batch {
                return Ok(visible);
            }
            offset += batch;
        }
    }

    /// Fetch one entity row by id, without any permission check.
    pub async fn find(
        pool: &PgPool,
        kind: EntityKind,
        id: DbId,
    ) -> Result<Option<EntityRow>, sqlx::Error> {
        let query = format!("{} WHERE {}.id = $1", row_select(kind), kind.table());
        sqlx::query_as::<_, EntityRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Evaluate `actor`'s permissions on one entity.
    ///
    /// An absent entity yields `{read: false, write: false}` rather than an
    /// error; callers cannot tell "missing" from "invisible".
    pub async fn check_permission(
        pool: &PgPool,
        actor: &Actor,
        kind: EntityKind,
        id: DbId,
    ) -> Result<Access, sqlx::Error> {
        match Self::find(pool, kind, id).await? {
            Some(row) => Ok(evaluate(actor, kind, &row.record())),
            None => Ok(Access::DENIED),
        }
    }

    /// Toggle the lock on an entity.
    ///
    /// Templates are a no-op. The read-modify-write runs in a transaction
    /// with a row lock, and the UPDATE carries a compare-and-swap on the
    /// expected state so a lost race surfaces as `Conflict` instead of
    /// silently overriding the other request.
    pub async fn toggle_lock(
        pool: &PgPool,
        actor: &Actor,
        kind: EntityKind,
        id: DbId,
    ) -> Result<LockState, DbError> {
        if !kind.lockable() {
            return Ok(LockState {
                locked: false,
                locked_by: None,
                locked_at: None,
            });
        }

        let table = kind.table();
        let mut tx = pool.begin().await?;

        let query = format!("{} WHERE {table}.id = $1 FOR UPDATE", row_select(kind));
        let row = sqlx::query_as::<_, EntityRow>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(no_rights)?;

        let access = evaluate(actor, kind, &row.record());
        match check_toggle(actor, kind, &row.record(), access) {
            Ok(ToggleOutcome::Toggle) => {}
            Ok(ToggleOutcome::Noop) => {
                return Ok(LockState {
                    locked: row.locked,
                    locked_by: row.lockedby,
                    locked_at: row.lockedwhen,
                });
            }
            Err(LockDenial::NotAllowed) => return Err(no_rights().into()),
            Err(LockDenial::LockedByOther(locker)) => {
                let name = UserRepo::display_name(&mut *tx, locker)
                    .await?
                    .unwrap_or_else(|| "another user".to_string());
                return Err(CoreError::Forbidden(format!(
                    "This {} was locked by {name}. You don't have the rights to unlock it.",
                    kind.noun()
                ))
                .into());
            }
            Err(LockDenial::Timestamped) => {
                return Err(CoreError::Immutable(
                    "You cannot unlock or edit in any way a timestamped experiment.".to_string(),
                )
                .into());
            }
        }

        let next = apply_toggle(
            LockState {
                locked: row.locked,
                locked_by: row.lockedby,
                locked_at: row.lockedwhen,
            },
            actor.user_id,
            chrono::Utc::now(),
        );
        let update = format!(
            "UPDATE {table} SET locked = $1, lockedby = $2, lockedwhen = $3 \
             WHERE id = $4 AND locked = $5 \
             RETURNING locked, lockedby, lockedwhen"
        );
        let state = sqlx::query_as::<_, LockRow>(&update)
            .bind(next.locked)
            .bind(next.locked_by)
            .bind(next.locked_at)
            .bind(id)
            .bind(row.locked)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| {
                CoreError::Conflict("Lock state changed concurrently, try again.".to_string())
            })?;

        tx.commit().await?;
        tracing::debug!(kind = kind.table(), id, locked = state.locked, "lock toggled");
        Ok(state.into())
    }

    /// Update title, date, and body of an entity.
    ///
    /// Write-gated; refuses locked entities. The previous body is
    /// snapshotted as a revision before the update commits. When an admin
    /// edits an owner-only item, the original owner is preserved.
    pub async fn update(
        pool: &PgPool,
        actor: &Actor,
        kind: EntityKind,
        id: DbId,
        input: &UpdateEntity,
    ) -> Result<(), DbError> {
        let table = kind.table();
        let mut tx = pool.begin().await?;

        let query = format!("{} WHERE {table}.id = $1 FOR UPDATE", row_select(kind));
        let row = sqlx::query_as::<_, EntityRow>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(no_rights)?;

        let access = evaluate(actor, kind, &row.record());
        if !access.write {
            return Err(no_rights().into());
        }
        if row.locked {
            return Err(CoreError::Conflict("Cannot update a locked entry.".to_string()).into());
        }

        let title = filter::title(&input.title);
        let date = filter::kdate(input.date.as_deref());
        let body = filter::body(&input.body)?;

        if kind != EntityKind::Template {
            RevisionRepo::create(&mut *tx, kind, id, actor.user_id, &row.body).await?;
        }

        if kind == EntityKind::Item {
            // an admin edit on an owner-only item must not steal ownership
            let owner = if Visibility::parse(&row.visibility) == Visibility::Owner {
                row.userid
            } else {
                actor.user_id
            };
            sqlx::query(
                "UPDATE items SET title = $1, date = $2, body = $3, userid = $4, \
                 updated_at = NOW() WHERE id = $5",
            )
            .bind(&title)
            .bind(&date)
            .bind(body)
            .bind(owner)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        } else {
            let update = format!(
                "UPDATE {table} SET title = $1, date = $2, body = $3, \
                 updated_at = NOW() WHERE id = $4"
            );
            sqlx::query(&update)
                .bind(&title)
                .bind(&date)
                .bind(body)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Update the visibility marker of an entity. Write-gated.
    pub async fn update_visibility(
        pool: &PgPool,
        actor: &Actor,
        kind: EntityKind,
        id: DbId,
        marker: &str,
    ) -> Result<(), DbError> {
        if !Visibility::is_valid_marker(marker) {
            return Err(
                CoreError::Validation(format!("Invalid visibility marker: {marker}")).into(),
            );
        }
        let access = Self::check_permission(pool, actor, kind, id).await?;
        if !access.write {
            return Err(no_rights().into());
        }

        let update = format!(
            "UPDATE {} SET visibility = $1, updated_at = NOW() WHERE id = $2",
            kind.table()
        );
        sqlx::query(&update)
            .bind(marker)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Update the category (status or item type) of an entity. Write-gated.
    pub async fn update_category(
        pool: &PgPool,
        actor: &Actor,
        kind: EntityKind,
        id: DbId,
        category: DbId,
    ) -> Result<(), DbError> {
        filter::check_id(category)?;
        let access = Self::check_permission(pool, actor, kind, id).await?;
        if !access.write {
            return Err(no_rights().into());
        }

        let update = format!(
            "UPDATE {} SET category = $1, updated_at = NOW() WHERE id = $2",
            kind.table()
        );
        sqlx::query(&update)
            .bind(category)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Direct tag lookup for one entity, bypassing the listing join.
    pub async fn get_tags(
        pool: &PgPool,
        kind: EntityKind,
        id: DbId,
    ) -> Result<Vec<TagLink>, sqlx::Error> {
        TagRepo::list_for(pool, kind, id).await
    }

    /// Resolve a raw visibility marker to a display label. A group marker
    /// whose group has been deleted degrades to "Unknown group".
    pub async fn resolve_visibility(pool: &PgPool, raw: &str) -> Result<String, sqlx::Error> {
        let visibility = Visibility::parse(raw);
        let group_name = match visibility {
            Visibility::Group(group_id) => TeamGroupRepo::resolve_name(pool, group_id).await?,
            _ => None,
        };
        Ok(visibility.label(group_name.as_deref()))
    }
}

/// Denial used for both "does not exist" and "exists but not yours", so
/// mutation attempts cannot probe for entity existence.
fn no_rights() -> CoreError {
    CoreError::Forbidden("You don't have the rights to do this.".to_string())
}

/// Push readable rows into `visible` until `limit` is reached.
///
/// Returns true once the page is full.
fn absorb_visible<F>(
    visible: &mut Vec<EntityListing>,
    rows: Vec<EntityListing>,
    limit: usize,
    is_readable: F,
) -> bool
where
    F: Fn(&EntityListing) -> bool,
{
    for row in rows {
        if is_readable(&row) {
            visible.push(row);
            if visible.len() >= limit {
                return true;
            }
        }
    }
    false
}

/// SELECT clause for a full [`EntityRow`] of the given kind. Columns a kind
/// lacks are surfaced as constants so one row type covers all three tables.
fn row_select(kind: EntityKind) -> String {
    let table = kind.table();
    let timestamped = match kind {
        EntityKind::Experiment => "experiments.timestamped".to_string(),
        _ => "FALSE AS timestamped".to_string(),
    };
    let rating = match kind {
        EntityKind::Item => "items.rating".to_string(),
        _ => "NULL::SMALLINT AS rating".to_string(),
    };
    format!(
        "SELECT {table}.id, {table}.team, {table}.userid, {table}.title, {table}.date, \
         {table}.body, {table}.category, {table}.visibility, {table}.locked, \
         {table}.lockedby, {table}.lockedwhen, {timestamped}, {rating}, \
         {table}.created_at, {table}.updated_at FROM {table}"
    )
}

/// Assemble the full listing query for one kind.
///
/// Returns the SQL (with `LIMIT`/`OFFSET` as the last two placeholders,
/// bound by the caller) and the bind values for everything before them.
fn listing_sql(
    kind: EntityKind,
    include_tags: bool,
    filters: &ListFilters,
    team: DbId,
) -> (String, Vec<BindValue>) {
    let table = kind.table();
    let mut sql = listing_select(kind, include_tags);
    let mut conditions: Vec<String> = Vec::new();
    let mut binds: Vec<BindValue> = Vec::new();
    let mut idx = 1u32;

    // single-id lookups bypass team scoping; the permission check decides
    if filters.id_filter().is_none() {
        conditions.push(format!("{table}.team = ${idx}"));
        binds.push(BindValue::BigInt(team));
        idx += 1;
    }

    let (filter_conditions, filter_binds, next_idx) = build_conditions(kind, filters, idx);
    conditions.extend(filter_conditions);
    binds.extend(filter_binds);

    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }

    let order = order_column(kind, filters.order);
    let dir = filters.sort.keyword();
    sql.push_str(&format!(
        " ORDER BY {table}.{order} {dir}, {table}.id {dir} LIMIT ${next_idx} OFFSET ${}",
        next_idx + 1
    ));

    (sql, binds)
}

/// Order column, with the items-only rating column falling back to date for
/// kinds whose table lacks it.
fn order_column(kind: EntityKind, order: OrderBy) -> &'static str {
    if order == OrderBy::Rating && kind != EntityKind::Item {
        return OrderBy::Date.column();
    }
    order.column()
}

/// SELECT + JOIN clauses for a listing of the given kind.
///
/// All aggregates (attachments, comments, tags) are pre-grouped in join
/// subqueries so the outer query needs no GROUP BY.
fn listing_select(kind: EntityKind, include_tags: bool) -> String {
    let table = kind.table();
    let cat_table = kind.category_table();

    let timestamped = match kind {
        EntityKind::Experiment => "experiments.timestamped".to_string(),
        _ => "FALSE AS timestamped".to_string(),
    };
    let rating = match kind {
        EntityKind::Item => "items.rating".to_string(),
        _ => "NULL::SMALLINT AS rating".to_string(),
    };
    let bookable = match kind {
        EntityKind::Item => "cat.bookable".to_string(),
        _ => "NULL::BOOLEAN AS bookable".to_string(),
    };
    let tags_select = if include_tags {
        "tagagg.tags, tagagg.tag_ids"
    } else {
        "NULL AS tags, NULL AS tag_ids"
    };

    // templates carry neither uploads nor comments
    let (attachment_select, attachment_join) = if kind == EntityKind::Template {
        ("FALSE AS has_attachment".to_string(), String::new())
    } else {
        (
            "COALESCE(up.has_attachment, FALSE) AS has_attachment".to_string(),
            format!(
                " LEFT JOIN (SELECT item_id, TRUE AS has_attachment FROM uploads \
                 WHERE type = '{table}' GROUP BY item_id) AS up ON up.item_id = {table}.id"
            ),
        )
    };

    let (comment_select, comment_join) = match kind {
        EntityKind::Template => (
            "NULL::TIMESTAMPTZ AS recent_comment, FALSE AS has_comment".to_string(),
            String::new(),
        ),
        _ => {
            let comments_table = match kind {
                EntityKind::Experiment => "experiments_comments",
                _ => "items_comments",
            };
            (
                "cm.recent_comment, (cm.recent_comment IS NOT NULL) AS has_comment".to_string(),
                format!(
                    " LEFT JOIN (SELECT item_id, MAX(created_at) AS recent_comment \
                     FROM {comments_table} GROUP BY item_id) AS cm ON cm.item_id = {table}.id"
                ),
            )
        }
    };

    let tags_join = if include_tags {
        format!(
            " LEFT JOIN (SELECT te.item_id, \
             string_agg(t.tag, '|' ORDER BY t.id) AS tags, \
             string_agg(t.id::TEXT, ',' ORDER BY t.id) AS tag_ids \
             FROM (SELECT DISTINCT item_id, tag_id FROM tags2entity \
             WHERE item_type = '{table}') AS te \
             JOIN tags AS t ON t.id = te.tag_id \
             GROUP BY te.item_id) AS tagagg ON tagagg.item_id = {table}.id"
        )
    } else {
        String::new()
    };

    format!(
        "SELECT {table}.id, {table}.team, {table}.userid, \
         users.firstname || ' ' || users.lastname AS fullname, \
         {table}.title, {table}.date, {table}.body, {table}.visibility, \
         {table}.locked, {table}.lockedby, {table}.lockedwhen, {timestamped}, \
         cat.name AS category, cat.id AS category_id, cat.color AS category_color, \
         {bookable}, {rating}, {attachment_select}, {comment_select}, {tags_select} \
         FROM {table} \
         LEFT JOIN users ON users.userid = {table}.userid \
         LEFT JOIN {cat_table} AS cat ON cat.id = {table}.category\
         {attachment_join}{comment_join}{tags_join}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entity::SortDir;

    fn listing(id: DbId, owner: DbId, visibility: &str) -> EntityListing {
        EntityListing {
            id,
            team: 1,
            userid: owner,
            fullname: None,
            title: "t".into(),
            date: "20260101".into(),
            body: String::new(),
            visibility: visibility.into(),
            locked: false,
            lockedby: None,
            lockedwhen: None,
            timestamped: false,
            category: None,
            category_id: None,
            category_color: None,
            bookable: None,
            rating: None,
            has_attachment: false,
            has_comment: false,
            recent_comment: None,
            tags: None,
            tag_ids: None,
        }
    }

    #[test]
    fn absorb_stops_at_limit() {
        let rows: Vec<_> = (1..=10).map(|i| listing(i, 1, "team")).collect();
        let mut visible = Vec::new();
        let full = absorb_visible(&mut visible, rows, 3, |_| true);
        assert!(full);
        assert_eq!(visible.iter().map(|r| r.id).collect::<Vec<_>>(), [1, 2, 3]);
    }

    #[test]
    fn absorb_drops_unreadable_rows_silently() {
        let rows: Vec<_> = (1..=6).map(|i| listing(i, 1, "team")).collect();
        let mut visible = Vec::new();
        // only even ids readable, page not yet full
        let full = absorb_visible(&mut visible, rows, 5, |r| r.id % 2 == 0);
        assert!(!full);
        assert_eq!(visible.iter().map(|r| r.id).collect::<Vec<_>>(), [2, 4, 6]);
    }

    #[test]
    fn team_scope_dropped_for_id_lookup() {
        let mut filters = ListFilters::new();
        let (sql, binds) = listing_sql(EntityKind::Experiment, false, &filters, 9);
        assert!(sql.contains("WHERE experiments.team = $1"));
        assert_eq!(binds, vec![BindValue::BigInt(9)]);

        filters.set_id(5).unwrap();
        let (sql, binds) = listing_sql(EntityKind::Experiment, false, &filters, 9);
        assert!(!sql.contains("experiments.team = "));
        assert!(sql.contains("WHERE experiments.id = $1"));
        assert_eq!(binds, vec![BindValue::BigInt(5)]);
    }

    #[test]
    fn ordering_defaults_with_id_tiebreak() {
        let filters = ListFilters::new();
        let (sql, _) = listing_sql(EntityKind::Item, false, &filters, 1);
        assert!(sql.contains("ORDER BY items.date DESC, items.id DESC LIMIT $2 OFFSET $3"));
    }

    #[test]
    fn ascending_sort_applies_to_tiebreak_too() {
        let mut filters = ListFilters::new();
        filters.sort = SortDir::Asc;
        filters.order = OrderBy::Title;
        let (sql, _) = listing_sql(EntityKind::Experiment, false, &filters, 1);
        assert!(sql.contains("ORDER BY experiments.title ASC, experiments.id ASC"));
    }

    #[test]
    fn rating_order_falls_back_off_items() {
        assert_eq!(order_column(EntityKind::Item, OrderBy::Rating), "rating");
        assert_eq!(order_column(EntityKind::Experiment, OrderBy::Rating), "date");
    }

    #[test]
    fn tag_aggregation_orders_by_tag_id_and_dedupes() {
        let sql = listing_select(EntityKind::Experiment, true);
        assert!(sql.contains("string_agg(t.tag, '|' ORDER BY t.id) AS tags"));
        assert!(sql.contains("SELECT DISTINCT item_id, tag_id FROM tags2entity"));
        assert!(sql.contains("item_type = 'experiments'"));
    }

    #[test]
    fn tags_omitted_unless_requested() {
        let sql = listing_select(EntityKind::Item, false);
        assert!(sql.contains("NULL AS tags, NULL AS tag_ids"));
        assert!(!sql.contains("tagagg"));
    }

    #[test]
    fn templates_skip_upload_and_comment_joins() {
        let sql = listing_select(EntityKind::Template, true);
        assert!(sql.contains("FALSE AS has_attachment"));
        assert!(sql.contains("NULL::TIMESTAMPTZ AS recent_comment"));
        assert!(!sql.contains("FROM uploads"));
        assert!(!sql.contains("_comments"));
    }

    #[test]
    fn experiment_listing_joins_comments_and_uploads() {
        let sql = listing_select(EntityKind::Experiment, false);
        assert!(sql.contains("FROM experiments_comments"));
        assert!(sql.contains("WHERE type = 'experiments'"));
        assert!(sql.contains("LEFT JOIN status AS cat"));
    }

    #[test]
    fn item_listing_exposes_bookable() {
        let sql = listing_select(EntityKind::Item, false);
        assert!(sql.contains("cat.bookable"));
        assert!(sql.contains("LEFT JOIN items_types AS cat"));
    }
}
