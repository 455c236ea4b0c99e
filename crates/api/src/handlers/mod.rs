pub mod auth;
pub mod entities;
pub mod health;
pub mod team_groups;
