//! Catalog schema bootstrap
//!
//! Schema definitions here are the single source of truth; tables are
//! created on module startup. There is no migration framework - columns
//! append, and a version bump in `analysis_version` marks stale rows.

use crate::error::Result;
use sqlx::SqlitePool;

/// Create all catalog tables if absent
pub async fn initialize_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tracks (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            original_name TEXT NOT NULL,
            mime TEXT NOT NULL,
            storage_key TEXT NOT NULL,
            content_hash TEXT,
            genre TEXT,
            bpm REAL,
            bpm_confidence REAL NOT NULL DEFAULT 0,
            key_signature TEXT,
            camelot_key TEXT,
            key_confidence REAL NOT NULL DEFAULT 0,
            duration_seconds REAL,
            beat_grid TEXT,
            phrases TEXT,
            structure TEXT,
            drop_moments TEXT,
            waveform_lite TEXT,
            cue_points TEXT,
            analysis_status TEXT NOT NULL DEFAULT 'pending',
            analysis_version TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tracks_user ON tracks(user_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tracks_status ON tracks(analysis_status)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stems (
            id TEXT PRIMARY KEY,
            track_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            storage_key TEXT,
            mime TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            quality TEXT NOT NULL DEFAULT 'draft',
            engine TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(track_id, kind, quality)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_stems_track ON stems(track_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS mashups (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            name TEXT NOT NULL,
            target_duration_seconds INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            mix_mode TEXT NOT NULL DEFAULT 'standard',
            track_ids TEXT NOT NULL,
            request TEXT NOT NULL,
            plan TEXT,
            output_key TEXT,
            generation_time_ms INTEGER,
            failure_reason TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_mashups_user ON mashups(user_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_mashups_status ON mashups(status)")
        .execute(pool)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_schema_bootstrap_is_idempotent() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        initialize_schema(&pool).await.unwrap();
        initialize_schema(&pool).await.unwrap();

        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('tracks','stems','mashups')")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count.0, 3);
    }
}
