//! Repository for the `users` table and team-group memberships.

use benchbook_core::entity::Actor;
use benchbook_core::types::DbId;
use sqlx::postgres::PgExecutor;
use sqlx::PgPool;

use crate::models::user::User;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "userid, team, firstname, lastname, email, password_hash, \
                       is_admin, can_lock, created_at";

/// Provides lookups for users and the permission engine's view of them.
pub struct UserRepo;

impl UserRepo {
    /// Find a user by internal id.
    pub async fn find_by_id(pool: &PgPool, userid: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE userid = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(userid)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by email (case-insensitive), for authentication.
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Load the permission engine's [`Actor`] for a user: identity, team,
    /// capabilities, and team-group memberships.
    pub async fn find_actor(pool: &PgPool, userid: DbId) -> Result<Option<Actor>, sqlx::Error> {
        let Some(user) = Self::find_by_id(pool, userid).await? else {
            return Ok(None);
        };
        let group_ids = Self::group_ids(pool, userid).await?;
        Ok(Some(Actor {
            user_id: user.userid,
            team_id: user.team,
            is_admin: user.is_admin,
            can_lock: user.can_lock,
            group_ids,
        }))
    }

    /// Team-group ids the user belongs to, ascending.
    pub async fn group_ids(pool: &PgPool, userid: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT groupid FROM users2team_groups WHERE userid = $1 ORDER BY groupid",
        )
        .bind(userid)
        .fetch_all(pool)
        .await
    }

    /// Display name of a user, used to enrich lock denial messages.
    pub async fn display_name(
        executor: impl PgExecutor<'_>,
        userid: DbId,
    ) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT firstname || ' ' || lastname FROM users WHERE userid = $1",
        )
        .bind(userid)
        .fetch_optional(executor)
        .await
    }
}
