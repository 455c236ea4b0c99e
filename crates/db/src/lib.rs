//! Storage layer for benchbook.
//!
//! Connection pool setup, migrations, and the repositories implementing the
//! entity reader, lock coordinator, and collaborator lookups. The pool is
//! created once at startup and passed explicitly to every repository method;
//! there is no process-wide connection singleton.

pub mod models;
pub mod repositories;

use benchbook_core::error::CoreError;
use sqlx::postgres::PgPoolOptions;

/// Shared Postgres connection pool type.
pub type DbPool = sqlx::PgPool;

/// Error type for repository operations that mix domain rules with storage.
///
/// Plain CRUD methods return `sqlx::Error` directly; operations that also
/// enforce permissions (listing, lock toggling, updates) return this.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Verify the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}

/// Apply pending migrations from `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!().run(pool).await
}
