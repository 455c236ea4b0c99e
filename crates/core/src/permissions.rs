//! The permission engine.
//!
//! Computes `{read, write}` for a requesting user and a target entity.
//! Listing queries call this once per fetched row; it is the authoritative
//! access-control enforcement point, not the SQL WHERE clause.

use crate::entity::{Actor, EntityKind, EntityRecord};
use crate::visibility::Visibility;

/// Result of a permission evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    pub read: bool,
    pub write: bool,
}

impl Access {
    pub const DENIED: Access = Access {
        read: false,
        write: false,
    };
}

/// Evaluate read/write permission for `actor` on one entity record.
///
/// Rules, common to all kinds:
/// - the owner always has full access, regardless of visibility;
/// - a team admin has write (and therefore read) on entities of their own
///   team, except owner-only items (see below);
/// - read additionally follows the visibility marker: team-wide markers open
///   the entity to same-team members, group markers to group members.
///
/// Owner-only (`"user"`) items are the one asymmetry: only the owner may
/// write or read them, even when a team admin is acting. Experiments keep
/// the admin override for every visibility.
pub fn evaluate(actor: &Actor, kind: EntityKind, record: &EntityRecord) -> Access {
    let visibility = Visibility::parse(&record.visibility);

    if record.owner_id == actor.user_id {
        return Access {
            read: true,
            write: true,
        };
    }

    let same_team = record.team_id == actor.team_id;

    let admin_override = match kind {
        EntityKind::Experiment | EntityKind::Template => true,
        // Owner-only items stay private to their owner.
        EntityKind::Item => visibility != Visibility::Owner,
    };

    let write = actor.is_admin && same_team && admin_override;

    let read = write
        || match visibility {
            Visibility::Team => same_team,
            Visibility::Owner => false,
            Visibility::Group(group_id) => actor.is_member_of(group_id),
        };

    Access { read, write }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(user_id: i64, team_id: i64) -> Actor {
        Actor {
            user_id,
            team_id,
            is_admin: false,
            can_lock: false,
            group_ids: Vec::new(),
        }
    }

    fn record(owner_id: i64, team_id: i64, visibility: &str) -> EntityRecord {
        EntityRecord {
            id: 1,
            owner_id,
            team_id,
            visibility: visibility.to_string(),
            locked: false,
            locked_by: None,
            locked_at: None,
            timestamped: false,
        }
    }

    #[test]
    fn owner_has_full_access_regardless_of_visibility() {
        let user = actor(10, 1);
        for vis in ["team", "user", "99"] {
            for kind in [EntityKind::Experiment, EntityKind::Template, EntityKind::Item] {
                let access = evaluate(&user, kind, &record(10, 1, vis));
                assert!(access.read && access.write, "{kind:?} vis={vis}");
            }
        }
    }

    #[test]
    fn cross_team_entity_is_invisible() {
        let user = actor(10, 1);
        let rec = record(20, 2, "team");
        for kind in [EntityKind::Experiment, EntityKind::Template, EntityKind::Item] {
            assert_eq!(evaluate(&user, kind, &rec), Access::DENIED);
        }
    }

    #[test]
    fn team_visibility_grants_read_not_write() {
        let user = actor(10, 1);
        let access = evaluate(&user, EntityKind::Experiment, &record(20, 1, "team"));
        assert!(access.read);
        assert!(!access.write);
    }

    #[test]
    fn group_visibility_requires_membership() {
        let mut user = actor(10, 1);
        let rec = record(20, 1, "7");

        assert!(!evaluate(&user, EntityKind::Experiment, &rec).read);

        user.group_ids.push(7);
        let access = evaluate(&user, EntityKind::Experiment, &rec);
        assert!(access.read);
        assert!(!access.write);
    }

    #[test]
    fn admin_override_on_experiments() {
        let mut admin = actor(10, 1);
        admin.is_admin = true;

        for vis in ["team", "user", "7"] {
            let access = evaluate(&admin, EntityKind::Experiment, &record(20, 1, vis));
            assert!(access.write, "vis={vis}");
        }
    }

    #[test]
    fn admin_of_other_team_gets_nothing() {
        let mut admin = actor(10, 1);
        admin.is_admin = true;
        let access = evaluate(&admin, EntityKind::Experiment, &record(20, 2, "team"));
        assert_eq!(access, Access::DENIED);
    }

    #[test]
    fn admin_cannot_write_owner_only_item() {
        let mut admin = actor(10, 1);
        admin.is_admin = true;

        let access = evaluate(&admin, EntityKind::Item, &record(20, 1, "user"));
        assert_eq!(access, Access::DENIED);

        // but the same admin does get write on a team-visible item
        let access = evaluate(&admin, EntityKind::Item, &record(20, 1, "team"));
        assert!(access.write);
    }

    #[test]
    fn owner_only_item_invisible_to_teammates() {
        let user = actor(10, 1);
        let access = evaluate(&user, EntityKind::Item, &record(20, 1, "user"));
        assert_eq!(access, Access::DENIED);
    }
}
