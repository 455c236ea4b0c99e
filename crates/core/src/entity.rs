//! Entity kinds and the permission-relevant view of an entity row.
//!
//! The notebook stores three kinds of entities. Behavior differences between
//! them (which table they live in, whether they can be locked, which category
//! table they join) are dispatched through [`EntityKind`] rather than by
//! inspecting concrete types.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// The three kinds of entity subject to permission and listing logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A lab experiment. Lockable, and may be cryptographically timestamped.
    Experiment,
    /// An experiment template. Exempt from lock semantics entirely.
    Template,
    /// An inventory ("database") item. Lockable, never timestamped.
    Item,
}

impl EntityKind {
    /// The table this kind lives in. Also used as the `item_type`
    /// discriminator in `tags2entity` and `uploads`.
    pub fn table(self) -> &'static str {
        match self {
            EntityKind::Experiment => "experiments",
            EntityKind::Template => "experiments_templates",
            EntityKind::Item => "items",
        }
    }

    /// The category lookup table joined in listings.
    pub fn category_table(self) -> &'static str {
        match self {
            EntityKind::Experiment | EntityKind::Template => "status",
            EntityKind::Item => "items_types",
        }
    }

    /// Templates are exempt from lock semantics.
    pub fn lockable(self) -> bool {
        !matches!(self, EntityKind::Template)
    }

    /// Human-readable noun for error messages.
    pub fn noun(self) -> &'static str {
        match self {
            EntityKind::Experiment => "experiment",
            EntityKind::Template => "template",
            EntityKind::Item => "item",
        }
    }

    /// Parse a URL segment (`experiments`, `templates`, `items`).
    pub fn from_path(segment: &str) -> Result<Self, CoreError> {
        match segment {
            "experiments" => Ok(EntityKind::Experiment),
            "templates" => Ok(EntityKind::Template),
            "items" => Ok(EntityKind::Item),
            other => Err(CoreError::Validation(format!(
                "Unknown entity kind: {other}"
            ))),
        }
    }
}

/// The requesting user, as the permission engine sees them.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: DbId,
    pub team_id: DbId,
    /// Admin of their own team. Grants no powers in other teams.
    pub is_admin: bool,
    /// Standing capability to lock/unlock regardless of write permission.
    pub can_lock: bool,
    /// Team-group memberships, used to resolve group-scoped visibility.
    pub group_ids: Vec<DbId>,
}

impl Actor {
    pub fn is_member_of(&self, group_id: DbId) -> bool {
        self.group_ids.contains(&group_id)
    }
}

/// The permission-relevant columns of an entity row.
///
/// Row types in `benchbook-db` convert into this so the engine never touches
/// sqlx types directly.
#[derive(Debug, Clone)]
pub struct EntityRecord {
    pub id: DbId,
    pub owner_id: DbId,
    pub team_id: DbId,
    /// Raw visibility marker: `"team"`, `"user"`, or a group id in digits.
    pub visibility: String,
    pub locked: bool,
    pub locked_by: Option<DbId>,
    pub locked_at: Option<Timestamp>,
    /// Only ever true for experiments.
    pub timestamped: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn kind_dispatch_tables() {
        assert_eq!(EntityKind::Experiment.table(), "experiments");
        assert_eq!(EntityKind::Template.table(), "experiments_templates");
        assert_eq!(EntityKind::Item.table(), "items");
        assert_eq!(EntityKind::Item.category_table(), "items_types");
        assert_eq!(EntityKind::Experiment.category_table(), "status");
    }

    #[test]
    fn only_templates_are_unlockable() {
        assert!(EntityKind::Experiment.lockable());
        assert!(EntityKind::Item.lockable());
        assert!(!EntityKind::Template.lockable());
    }

    #[test]
    fn path_segments_parse() {
        assert_matches!(
            EntityKind::from_path("experiments"),
            Ok(EntityKind::Experiment)
        );
        assert_matches!(EntityKind::from_path("items"), Ok(EntityKind::Item));
        assert_matches!(
            EntityKind::from_path("bogus"),
            Err(CoreError::Validation(_))
        );
    }
}
