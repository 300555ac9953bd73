//! Catalog access for automix-mx
//!
//! SQLite via sqlx. Per-entity modules expose free async functions on a
//! pool reference; vector-valued analysis fields and plans are stored as
//! JSON text columns.

pub mod mashups;
pub mod schema;
pub mod stems;
pub mod tracks;

use crate::error::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize the catalog connection pool and bootstrap the schema
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to catalog: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    schema::initialize_schema(&pool).await?;

    Ok(pool)
}

/// In-memory pool for tests
///
/// Capped at one connection: every pooled connection to `:memory:`
/// would otherwise see its own empty database.
pub async fn init_test_pool() -> Result<SqlitePool> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    schema::initialize_schema(&pool).await?;
    Ok(pool)
}
