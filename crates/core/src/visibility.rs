//! Visibility marker parsing and display labels.
//!
//! The stored marker is a string: `"team"` (readable by the whole team),
//! `"user"` (owner only), or the digits of a team-group id. Anything
//! unrecognized is treated as team-wide, matching the storage default.

use crate::types::DbId;

/// Semantic classification of a raw visibility marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Readable by every member of the entity's team.
    Team,
    /// Readable by the owner alone.
    Owner,
    /// Readable by members of one team group.
    Group(DbId),
}

impl Visibility {
    /// Classify a raw marker. A string of digits parsing to a positive id
    /// means a team group; `"user"` means owner-only; everything else is
    /// team-wide.
    pub fn parse(raw: &str) -> Self {
        if let Ok(id) = raw.parse::<DbId>() {
            if id > 0 {
                return Visibility::Group(id);
            }
        }
        if raw == "user" {
            return Visibility::Owner;
        }
        Visibility::Team
    }

    /// Whether `raw` is a marker this system will store.
    pub fn is_valid_marker(raw: &str) -> bool {
        matches!(raw, "team" | "user") || raw.parse::<DbId>().map_or(false, |id| id > 0)
    }

    /// Human-facing label. For a group marker the caller passes the resolved
    /// group name; a group that no longer exists degrades to "Unknown group"
    /// rather than failing the whole read.
    pub fn label(self, group_name: Option<&str>) -> String {
        match self {
            Visibility::Team => "Team".to_string(),
            Visibility::Owner => "Owner".to_string(),
            Visibility::Group(_) => group_name.unwrap_or("Unknown group").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_classify() {
        assert_eq!(Visibility::parse("team"), Visibility::Team);
        assert_eq!(Visibility::parse("user"), Visibility::Owner);
        assert_eq!(Visibility::parse("42"), Visibility::Group(42));
        // zero and negative ids are not groups
        assert_eq!(Visibility::parse("0"), Visibility::Team);
        assert_eq!(Visibility::parse("-3"), Visibility::Team);
        // unknown strings fall back to the storage default
        assert_eq!(Visibility::parse("everyone"), Visibility::Team);
    }

    #[test]
    fn labels_resolve() {
        assert_eq!(Visibility::Team.label(None), "Team");
        assert_eq!(Visibility::Owner.label(None), "Owner");
        assert_eq!(Visibility::Group(7).label(Some("Biochem")), "Biochem");
    }

    #[test]
    fn deleted_group_degrades_softly() {
        assert_eq!(Visibility::Group(7).label(None), "Unknown group");
    }

    #[test]
    fn marker_validation() {
        assert!(Visibility::is_valid_marker("team"));
        assert!(Visibility::is_valid_marker("user"));
        assert!(Visibility::is_valid_marker("12"));
        assert!(!Visibility::is_valid_marker("0"));
        assert!(!Visibility::is_valid_marker("everyone"));
    }
}
