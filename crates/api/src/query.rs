//! Shared query parameter types for API handlers.

use benchbook_core::types::DbId;
use benchbook_db::models::entity::{ListFilters, OrderBy, SortDir};
use serde::Deserialize;

use crate::error::{AppError, AppResult};

/// Query parameters for entity listing endpoints.
///
/// Every field is optional; each one maps to one filter fragment. `limit`
/// counts visible rows after permission filtering.
#[derive(Debug, Default, Deserialize)]
pub struct EntityListParams {
    pub id: Option<DbId>,
    pub owner: Option<DbId>,
    pub title: Option<String>,
    pub date: Option<String>,
    pub body: Option<String>,
    pub category: Option<DbId>,
    pub tag: Option<String>,
    pub rating: Option<i16>,
    pub visibility: Option<String>,
    pub bookable: Option<bool>,
    /// Free-text search over title and body.
    pub q: Option<String>,
    pub order: Option<OrderBy>,
    pub sort: Option<SortDir>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// Include aggregated tag lists in the listing rows.
    #[serde(default)]
    pub tags: bool,
}

impl EntityListParams {
    /// Convert into validated [`ListFilters`]; rejected input becomes a 400.
    pub fn into_filters(self) -> AppResult<ListFilters> {
        let mut filters = ListFilters::new();
        if let Some(id) = self.id {
            filters.set_id(id).map_err(AppError::Core)?;
        }
        if let Some(owner) = self.owner {
            filters.set_owner(owner).map_err(AppError::Core)?;
        }
        if let Some(ref title) = self.title {
            filters.set_title(title);
        }
        if let Some(ref date) = self.date {
            filters.set_date(date).map_err(AppError::Core)?;
        }
        if let Some(ref body) = self.body {
            filters.set_body(body);
        }
        if let Some(category) = self.category {
            filters.set_category(category).map_err(AppError::Core)?;
        }
        if let Some(ref tag) = self.tag {
            filters.set_tag(tag);
        }
        if let Some(rating) = self.rating {
            filters.set_rating(rating).map_err(AppError::Core)?;
        }
        if let Some(ref visibility) = self.visibility {
            filters.set_visibility(visibility).map_err(AppError::Core)?;
        }
        if let Some(bookable) = self.bookable {
            filters.set_bookable(bookable);
        }
        if let Some(ref q) = self.q {
            filters.set_query(q);
        }
        if let Some(order) = self.order {
            filters.order = order;
        }
        if let Some(sort) = self.sort {
            filters.sort = sort;
        }
        if let Some(limit) = self.limit {
            filters.set_limit(limit).map_err(AppError::Core)?;
        }
        if let Some(offset) = self.offset {
            filters.set_offset(offset).map_err(AppError::Core)?;
        }
        Ok(filters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_values_become_client_errors() {
        let params = EntityListParams {
            id: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            params.into_filters(),
            Err(AppError::Core(
                benchbook_core::error::CoreError::Validation(_)
            ))
        ));
    }

    #[test]
    fn empty_params_build_default_filters() {
        let filters = EntityListParams::default().into_filters().unwrap();
        assert!(filters.id_filter().is_none());
    }
}
