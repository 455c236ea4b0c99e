//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` (or a transaction executor) as the first argument.

pub mod entity_filter;
pub mod entity_repo;
pub mod revision_repo;
pub mod tag_repo;
pub mod team_group_repo;
pub mod user_repo;

pub use entity_repo::EntityRepo;
pub use revision_repo::RevisionRepo;
pub use tag_repo::TagRepo;
pub use team_group_repo::TeamGroupRepo;
pub use user_repo::UserRepo;
