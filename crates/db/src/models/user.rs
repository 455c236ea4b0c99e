//! User model.

use benchbook_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Full user row from the `users` table.
///
/// Contains the password hash -- never serialize this to API responses.
/// Use [`UserResponse`] for external-facing output.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub userid: DbId,
    pub team: DbId,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub can_lock: bool,
    pub created_at: Timestamp,
}

impl User {
    pub fn fullname(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
    }
}

/// Safe user representation for API responses (no password hash).
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub userid: DbId,
    pub team: DbId,
    pub fullname: String,
    pub email: String,
    pub is_admin: bool,
    pub can_lock: bool,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        UserResponse {
            userid: user.userid,
            team: user.team,
            fullname: user.fullname(),
            email: user.email.clone(),
            is_admin: user.is_admin,
            can_lock: user.can_lock,
        }
    }
}
