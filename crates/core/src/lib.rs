//! Domain logic for the benchbook electronic lab notebook.
//!
//! Everything in this crate is pure: entity kinds, visibility markers, the
//! permission rules, lock-toggle decisions, and input filtering. All I/O
//! (query execution, group-name lookups) lives in `benchbook-db`.

pub mod entity;
pub mod error;
pub mod filter;
pub mod lock;
pub mod permissions;
pub mod types;
pub mod visibility;
