//! Dynamic WHERE-clause assembly for entity listings.
//!
//! Every caller-supplied value is carried as a typed [`BindValue`] and bound
//! as a `$n` parameter; fragment text only ever contains column names taken
//! from [`EntityKind`] dispatch, never user input.

use benchbook_core::entity::EntityKind;

use crate::models::entity::ListFilters;

/// Typed bind value for dynamically-built listing queries.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BindValue {
    BigInt(i64),
    SmallInt(i16),
    Text(String),
    Bool(bool),
}

/// Build the filter fragments for one listing query.
///
/// Returns `(conditions, bind_values, next_bind_index)`. Conditions are
/// emitted in a fixed fragment order; all are combined with AND by the
/// caller. The `bookable` and `rating` fragments only apply to items and are
/// skipped for other kinds, whose tables lack those columns.
pub(crate) fn build_conditions(
    kind: EntityKind,
    filters: &ListFilters,
    start_idx: u32,
) -> (Vec<String>, Vec<BindValue>, u32) {
    let table = kind.table();
    let mut conditions: Vec<String> = Vec::new();
    let mut bind_values: Vec<BindValue> = Vec::new();
    let mut bind_idx = start_idx;

    if let Some(id) = filters.id {
        conditions.push(format!("{table}.id = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::BigInt(id));
    }

    if let Some(owner) = filters.owner {
        conditions.push(format!("{table}.userid = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::BigInt(owner));
    }

    if let Some(ref title) = filters.title {
        conditions.push(format!("{table}.title ILIKE ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Text(format!("%{title}%")));
    }

    if let Some(ref date) = filters.date {
        conditions.push(format!("{table}.date = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Text(date.clone()));
    }

    if let Some(ref body) = filters.body {
        conditions.push(format!("{table}.body ILIKE ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Text(format!("%{body}%")));
    }

    if kind == EntityKind::Item {
        if let Some(bookable) = filters.bookable {
            conditions.push(format!("cat.bookable = ${bind_idx}"));
            bind_idx += 1;
            bind_values.push(BindValue::Bool(bookable));
        }
    }

    if let Some(category) = filters.category {
        conditions.push(format!("{table}.category = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::BigInt(category));
    }

    if let Some(ref query) = filters.query {
        conditions.push(format!(
            "({table}.title ILIKE ${bind_idx} OR {table}.body ILIKE ${})",
            bind_idx + 1
        ));
        bind_idx += 2;
        let pattern = format!("%{query}%");
        bind_values.push(BindValue::Text(pattern.clone()));
        bind_values.push(BindValue::Text(pattern));
    }

    if kind == EntityKind::Item {
        if let Some(rating) = filters.rating {
            conditions.push(format!("{table}.rating = ${bind_idx}"));
            bind_idx += 1;
            bind_values.push(BindValue::SmallInt(rating));
        }
    }

    if let Some(ref visibility) = filters.visibility {
        conditions.push(format!("{table}.visibility = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Text(visibility.clone()));
    }

    if let Some(ref tag) = filters.tag {
        conditions.push(format!(
            "EXISTS (SELECT 1 FROM tags2entity \
             JOIN tags ON tags.id = tags2entity.tag_id \
             WHERE tags2entity.item_id = {table}.id \
             AND tags2entity.item_type = '{table}' \
             AND tags.tag = ${bind_idx})"
        ));
        bind_idx += 1;
        bind_values.push(BindValue::Text(tag.clone()));
    }

    (conditions, bind_values, bind_idx)
}

/// Bind a slice of [`BindValue`] to a sqlx `QueryAs`.
pub(crate) fn bind_values<'q, O>(
    mut q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments>,
    values: &'q [BindValue],
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments> {
    for val in values {
        match val {
            BindValue::BigInt(v) => q = q.bind(*v),
            BindValue::SmallInt(v) => q = q.bind(*v),
            BindValue::Text(v) => q = q.bind(v.as_str()),
            BindValue::Bool(v) => q = q.bind(*v),
        }
    }
    q
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_filters_no_conditions() {
        let filters = ListFilters::new();
        let (conditions, values, next) =
            build_conditions(EntityKind::Experiment, &filters, 2);
        assert!(conditions.is_empty());
        assert!(values.is_empty());
        assert_eq!(next, 2);
    }

    #[test]
    fn each_fragment_binds_its_value() {
        let mut filters = ListFilters::new();
        filters.set_owner(4).unwrap();
        filters.set_title("buffer; DROP TABLE experiments");

        let (conditions, values, next) =
            build_conditions(EntityKind::Experiment, &filters, 1);
        assert_eq!(
            conditions,
            vec![
                "experiments.userid = $1".to_string(),
                "experiments.title ILIKE $2".to_string(),
            ]
        );
        // the hostile title travels as a bind value, never as SQL text
        assert_eq!(
            values,
            vec![
                BindValue::BigInt(4),
                BindValue::Text("%buffer; DROP TABLE experiments%".to_string()),
            ]
        );
        assert_eq!(next, 3);
    }

    #[test]
    fn free_text_spans_title_and_body() {
        let mut filters = ListFilters::new();
        filters.set_query("plasmid");
        let (conditions, values, next) = build_conditions(EntityKind::Item, &filters, 1);
        assert_eq!(
            conditions,
            vec!["(items.title ILIKE $1 OR items.body ILIKE $2)".to_string()]
        );
        assert_eq!(values.len(), 2);
        assert_eq!(next, 3);
    }

    #[test]
    fn tag_fragment_is_an_exists_subquery() {
        let mut filters = ListFilters::new();
        filters.set_tag("crispr");
        let (conditions, values, _) = build_conditions(EntityKind::Experiment, &filters, 1);
        assert_eq!(conditions.len(), 1);
        assert!(conditions[0].starts_with("EXISTS (SELECT 1 FROM tags2entity"));
        assert!(conditions[0].contains("tags2entity.item_type = 'experiments'"));
        assert!(conditions[0].contains("tags.tag = $1"));
        assert_eq!(values, vec![BindValue::Text("crispr".to_string())]);
    }

    #[test]
    fn item_only_fragments_skipped_for_other_kinds() {
        let mut filters = ListFilters::new();
        filters.set_rating(3).unwrap();
        filters.set_bookable(true);

        let (conditions, values, _) =
            build_conditions(EntityKind::Experiment, &filters, 1);
        assert!(conditions.is_empty());
        assert!(values.is_empty());

        let (conditions, _, _) = build_conditions(EntityKind::Item, &filters, 1);
        assert_eq!(
            conditions,
            vec!["cat.bookable = $1".to_string(), "items.rating = $2".to_string()]
        );
    }

    #[test]
    fn adding_fragments_only_narrows() {
        // each additional setter adds a conjunct; it can never widen the set
        let mut filters = ListFilters::new();
        let (base, _, _) = build_conditions(EntityKind::Item, &filters, 1);

        filters.set_title("a");
        let (one, _, _) = build_conditions(EntityKind::Item, &filters, 1);

        filters.set_body("b");
        let (two, _, _) = build_conditions(EntityKind::Item, &filters, 1);

        assert!(base.len() < one.len());
        assert!(one.len() < two.len());
        assert!(two.starts_with(&one[..]));
    }
}
