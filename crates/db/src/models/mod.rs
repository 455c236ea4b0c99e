//! Row structs and DTOs for the benchbook schema.

pub mod entity;
pub mod tag;
pub mod team_group;
pub mod user;
