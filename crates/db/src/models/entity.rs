//! Entity row types, listing rows, and the listing filter set.

use benchbook_core::entity::EntityRecord;
use benchbook_core::error::CoreError;
use benchbook_core::filter;
use benchbook_core::types::{DbId, Timestamp};
use benchbook_core::visibility::Visibility;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Full entity row as stored in `experiments` / `experiments_templates` /
/// `items`. Kinds lacking a column (items are never timestamped, only items
/// carry a rating) surface it as a constant in the SELECT.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EntityRow {
    pub id: DbId,
    pub team: DbId,
    pub userid: DbId,
    pub title: String,
    /// `YYYYMMDD`.
    pub date: String,
    pub body: String,
    pub category: Option<DbId>,
    pub visibility: String,
    pub locked: bool,
    pub lockedby: Option<DbId>,
    pub lockedwhen: Option<Timestamp>,
    pub timestamped: bool,
    pub rating: Option<i16>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl EntityRow {
    /// The permission-relevant view of this row.
    pub fn record(&self) -> EntityRecord {
        EntityRecord {
            id: self.id,
            owner_id: self.userid,
            team_id: self.team,
            visibility: self.visibility.clone(),
            locked: self.locked,
            locked_by: self.lockedby,
            locked_at: self.lockedwhen,
            timestamped: self.timestamped,
        }
    }
}

/// One row of a listing query: the entity plus owner name, category
/// metadata, attachment/comment aggregates, and (optionally) tags.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EntityListing {
    pub id: DbId,
    pub team: DbId,
    pub userid: DbId,
    /// Owner display name, joined from `users`.
    pub fullname: Option<String>,
    pub title: String,
    pub date: String,
    pub body: String,
    pub visibility: String,
    pub locked: bool,
    pub lockedby: Option<DbId>,
    pub lockedwhen: Option<Timestamp>,
    pub timestamped: bool,
    pub category: Option<String>,
    pub category_id: Option<DbId>,
    pub category_color: Option<String>,
    /// Items only; NULL for experiments and templates.
    pub bookable: Option<bool>,
    pub rating: Option<i16>,
    pub has_attachment: bool,
    pub has_comment: bool,
    pub recent_comment: Option<Timestamp>,
    /// `|`-separated tag names ordered by ascending tag id, deduplicated.
    /// NULL when tags were not requested or the entity has none.
    pub tags: Option<String>,
    /// Comma-separated tag ids in the same order.
    pub tag_ids: Option<String>,
}

impl EntityListing {
    pub fn record(&self) -> EntityRecord {
        EntityRecord {
            id: self.id,
            owner_id: self.userid,
            team_id: self.team,
            visibility: self.visibility.clone(),
            locked: self.locked,
            locked_by: self.lockedby,
            locked_at: self.lockedwhen,
            timestamped: self.timestamped,
        }
    }

    /// Split the aggregated tag column into a list.
    pub fn tag_list(&self) -> Vec<&str> {
        self.tags
            .as_deref()
            .map(|t| t.split('|').collect())
            .unwrap_or_default()
    }
}

/// DTO for body-mutating entity updates.
#[derive(Debug, Deserialize)]
pub struct UpdateEntity {
    pub title: String,
    /// `YYYYMMDD`; malformed input falls back to today.
    pub date: Option<String>,
    pub body: String,
}

/// Listing order column. An enum rather than a raw string so the ORDER BY
/// clause can never carry caller-controlled text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderBy {
    #[default]
    Date,
    Title,
    Id,
    CreatedAt,
    Rating,
}

impl OrderBy {
    pub(crate) fn column(self) -> &'static str {
        match self {
            OrderBy::Date => "date",
            OrderBy::Title => "title",
            OrderBy::Id => "id",
            OrderBy::CreatedAt => "created_at",
            OrderBy::Rating => "rating",
        }
    }
}

/// Listing sort direction, default descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

impl SortDir {
    pub(crate) fn keyword(self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

/// Default number of visible rows per listing page.
pub const DEFAULT_LIMIT: i64 = 15;

/// Upper bound on a caller-requested page size.
pub const MAX_LIMIT: i64 = 100;

/// The composable set of listing filters.
///
/// Each fragment is independently optional; all active fragments are ANDed
/// together. Setters validate input before it can reach query construction,
/// and an empty string clears the corresponding text fragment.
#[derive(Debug, Clone, Default)]
pub struct ListFilters {
    pub(crate) id: Option<DbId>,
    pub(crate) owner: Option<DbId>,
    pub(crate) title: Option<String>,
    pub(crate) date: Option<String>,
    pub(crate) body: Option<String>,
    pub(crate) category: Option<DbId>,
    pub(crate) tag: Option<String>,
    pub(crate) rating: Option<i16>,
    pub(crate) visibility: Option<String>,
    pub(crate) bookable: Option<bool>,
    pub(crate) query: Option<String>,
    pub order: OrderBy,
    pub sort: SortDir,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl ListFilters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to a single entity id. Bypasses team scoping.
    pub fn set_id(&mut self, id: DbId) -> Result<&mut Self, CoreError> {
        self.id = Some(filter::check_id(id)?);
        Ok(self)
    }

    pub fn set_owner(&mut self, userid: DbId) -> Result<&mut Self, CoreError> {
        self.owner = Some(filter::check_id(userid)?);
        Ok(self)
    }

    /// Substring match on the title.
    pub fn set_title(&mut self, term: &str) -> &mut Self {
        self.title = non_empty(term);
        self
    }

    /// Exact match on the `YYYYMMDD` date.
    pub fn set_date(&mut self, date: &str) -> Result<&mut Self, CoreError> {
        match non_empty(date) {
            None => self.date = None,
            Some(d) => {
                if chrono::NaiveDate::parse_from_str(&d, "%Y%m%d").is_err() {
                    return Err(CoreError::Validation(format!("Invalid date filter: {d}")));
                }
                self.date = Some(d);
            }
        }
        Ok(self)
    }

    /// Substring match on the body.
    pub fn set_body(&mut self, term: &str) -> &mut Self {
        self.body = non_empty(term);
        self
    }

    pub fn set_category(&mut self, category: DbId) -> Result<&mut Self, CoreError> {
        self.category = Some(filter::check_id(category)?);
        Ok(self)
    }

    /// Exact tag name match. Composes with other fragments by conjunction.
    pub fn set_tag(&mut self, tag: &str) -> &mut Self {
        self.tag = non_empty(tag);
        self
    }

    /// Items only; ignored for other kinds.
    pub fn set_rating(&mut self, rating: i16) -> Result<&mut Self, CoreError> {
        self.rating = Some(filter::check_rating(rating)?);
        Ok(self)
    }

    pub fn set_visibility(&mut self, marker: &str) -> Result<&mut Self, CoreError> {
        match non_empty(marker) {
            None => self.visibility = None,
            Some(m) => {
                if !Visibility::is_valid_marker(&m) {
                    return Err(CoreError::Validation(format!(
                        "Invalid visibility marker: {m}"
                    )));
                }
                self.visibility = Some(m);
            }
        }
        Ok(self)
    }

    /// Items only; ignored for other kinds.
    pub fn set_bookable(&mut self, bookable: bool) -> &mut Self {
        self.bookable = Some(bookable);
        self
    }

    /// Free-text search over title and body.
    pub fn set_query(&mut self, term: &str) -> &mut Self {
        self.query = non_empty(term);
        self
    }

    /// Number of *visible* rows the caller wants, clamped to [`MAX_LIMIT`].
    pub fn set_limit(&mut self, limit: i64) -> Result<&mut Self, CoreError> {
        if limit <= 0 {
            return Err(CoreError::Validation(format!("Invalid limit: {limit}")));
        }
        self.limit = Some(limit.min(MAX_LIMIT));
        Ok(self)
    }

    /// Number of raw rows to skip before permission filtering.
    pub fn set_offset(&mut self, offset: i64) -> Result<&mut Self, CoreError> {
        if offset < 0 {
            return Err(CoreError::Validation(format!("Invalid offset: {offset}")));
        }
        self.offset = Some(offset);
        Ok(self)
    }

    pub fn id_filter(&self) -> Option<DbId> {
        self.id
    }

    pub(crate) fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }

    pub(crate) fn offset(&self) -> i64 {
        self.offset.unwrap_or(0)
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn setters_validate_ids() {
        let mut filters = ListFilters::new();
        assert_matches!(filters.set_id(0), Err(CoreError::Validation(_)));
        assert_matches!(filters.set_owner(-1), Err(CoreError::Validation(_)));
        filters.set_id(3).unwrap();
        assert_eq!(filters.id_filter(), Some(3));
    }

    #[test]
    fn empty_string_clears_text_fragments() {
        let mut filters = ListFilters::new();
        filters.set_title("buffer");
        filters.set_title("   ");
        assert!(filters.title.is_none());
    }

    #[test]
    fn date_filter_must_be_kdate() {
        let mut filters = ListFilters::new();
        assert_matches!(filters.set_date("2026-03-12"), Err(CoreError::Validation(_)));
        filters.set_date("20260312").unwrap();
        assert_eq!(filters.date.as_deref(), Some("20260312"));
    }

    #[test]
    fn visibility_filter_rejects_unknown_markers() {
        let mut filters = ListFilters::new();
        assert_matches!(
            filters.set_visibility("everyone"),
            Err(CoreError::Validation(_))
        );
        filters.set_visibility("user").unwrap();
        filters.set_visibility("12").unwrap();
    }

    #[test]
    fn tag_list_splits_the_aggregate_column() {
        let mut listing = EntityListing {
            id: 1,
            team: 1,
            userid: 1,
            fullname: None,
            title: "t".into(),
            date: "20260101".into(),
            body: String::new(),
            visibility: "team".into(),
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
            tags: Some("crispr|plasmid".into()),
            tag_ids: Some("3,8".into()),
        };
        assert_eq!(listing.tag_list(), ["crispr", "plasmid"]);

        listing.tags = None;
        assert!(listing.tag_list().is_empty());
    }

    #[test]
    fn limit_is_clamped_and_positive() {
        let mut filters = ListFilters::new();
        assert_matches!(filters.set_limit(0), Err(CoreError::Validation(_)));
        filters.set_limit(1000).unwrap();
        assert_eq!(filters.limit(), MAX_LIMIT);
        assert_eq!(ListFilters::new().limit(), DEFAULT_LIMIT);
    }
}
