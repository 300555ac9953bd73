//! Stem catalog operations
//!
//! One row per (track, stem kind, quality). Stems complete
//! independently; a partial set is a valid completion.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// The four separable stems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StemKind {
    Vocals,
    Drums,
    Bass,
    Other,
}

impl StemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StemKind::Vocals => "vocals",
            StemKind::Drums => "drums",
            StemKind::Bass => "bass",
            StemKind::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "vocals" => Some(StemKind::Vocals),
            "drums" => Some(StemKind::Drums),
            "bass" => Some(StemKind::Bass),
            "other" => Some(StemKind::Other),
            _ => None,
        }
    }

    pub fn all() -> &'static [StemKind] {
        &[StemKind::Vocals, StemKind::Drums, StemKind::Bass, StemKind::Other]
    }
}

/// Per-stem lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StemStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl StemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StemStatus::Pending => "pending",
            StemStatus::Processing => "processing",
            StemStatus::Completed => "completed",
            StemStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(StemStatus::Pending),
            "processing" => Some(StemStatus::Processing),
            "completed" => Some(StemStatus::Completed),
            "failed" => Some(StemStatus::Failed),
            _ => None,
        }
    }
}

/// Separation quality tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StemQuality {
    Draft,
    Hifi,
}

impl StemQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            StemQuality::Draft => "draft",
            StemQuality::Hifi => "hifi",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(StemQuality::Draft),
            "hifi" => Some(StemQuality::Hifi),
            _ => None,
        }
    }
}

/// Stem record
#[derive(Debug, Clone)]
pub struct StemRecord {
    pub id: Uuid,
    pub track_id: Uuid,
    pub kind: StemKind,
    pub storage_key: Option<String>,
    pub mime: Option<String>,
    pub status: StemStatus,
    pub quality: StemQuality,
    pub engine: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn row_to_stem(row: &sqlx::sqlite::SqliteRow) -> Result<StemRecord> {
    let id: String = row.get("id");
    let track_id: String = row.get("track_id");
    let kind: String = row.get("kind");
    let status: String = row.get("status");
    let quality: String = row.get("quality");
    let created: String = row.get("created_at");
    let updated: String = row.get("updated_at");
    Ok(StemRecord {
        id: Uuid::parse_str(&id).map_err(|e| Error::Other(e.into()))?,
        track_id: Uuid::parse_str(&track_id).map_err(|e| Error::Other(e.into()))?,
        kind: StemKind::parse(&kind)
            .ok_or_else(|| Error::Other(anyhow::anyhow!("bad stem kind {kind:?}")))?,
        storage_key: row.get("storage_key"),
        mime: row.get("mime"),
        status: StemStatus::parse(&status)
            .ok_or_else(|| Error::Other(anyhow::anyhow!("bad stem status {status:?}")))?,
        quality: StemQuality::parse(&quality)
            .ok_or_else(|| Error::Other(anyhow::anyhow!("bad stem quality {quality:?}")))?,
        engine: row.get("engine"),
        created_at: DateTime::parse_from_rfc3339(&created)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        updated_at: DateTime::parse_from_rfc3339(&updated)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

/// Upsert a stem row (unique per track/kind/quality)
pub async fn upsert_stem(pool: &SqlitePool, stem: &StemRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO stems (id, track_id, kind, storage_key, mime, status, quality, engine, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(track_id, kind, quality) DO UPDATE SET
            storage_key = excluded.storage_key,
            mime = excluded.mime,
            status = excluded.status,
            engine = excluded.engine,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(stem.id.to_string())
    .bind(stem.track_id.to_string())
    .bind(stem.kind.as_str())
    .bind(&stem.storage_key)
    .bind(&stem.mime)
    .bind(stem.status.as_str())
    .bind(stem.quality.as_str())
    .bind(&stem.engine)
    .bind(stem.created_at.to_rfc3339())
    .bind(stem.updated_at.to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

/// Load one stem by id
pub async fn get_stem(pool: &SqlitePool, id: Uuid) -> Result<Option<StemRecord>> {
    let row = sqlx::query("SELECT * FROM stems WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(row_to_stem).transpose()
}

/// All stems of a track
pub async fn list_stems_for_track(pool: &SqlitePool, track_id: Uuid) -> Result<Vec<StemRecord>> {
    let rows = sqlx::query("SELECT * FROM stems WHERE track_id = ? ORDER BY kind")
        .bind(track_id.to_string())
        .fetch_all(pool)
        .await?;
    rows.iter().map(row_to_stem).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_test_pool;

    fn stem(track_id: Uuid, kind: StemKind) -> StemRecord {
        let now = Utc::now();
        StemRecord {
            id: Uuid::new_v4(),
            track_id,
            kind,
            storage_key: None,
            mime: None,
            status: StemStatus::Pending,
            quality: StemQuality::Draft,
            engine: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_upsert_replaces_on_conflict() {
        let pool = init_test_pool().await.unwrap();
        let track_id = Uuid::new_v4();
        let mut record = stem(track_id, StemKind::Vocals);
        upsert_stem(&pool, &record).await.unwrap();

        record.status = StemStatus::Completed;
        record.storage_key = Some(format!("{track_id}/stems/vocals.wav"));
        record.engine = Some("band_filter".into());
        upsert_stem(&pool, &record).await.unwrap();

        let stems = list_stems_for_track(&pool, track_id).await.unwrap();
        assert_eq!(stems.len(), 1);
        assert_eq!(stems[0].status, StemStatus::Completed);
        assert_eq!(stems[0].engine.as_deref(), Some("band_filter"));
    }

    #[tokio::test]
    async fn test_partial_set_is_valid() {
        let pool = init_test_pool().await.unwrap();
        let track_id = Uuid::new_v4();
        upsert_stem(&pool, &stem(track_id, StemKind::Vocals)).await.unwrap();
        upsert_stem(&pool, &stem(track_id, StemKind::Drums)).await.unwrap();

        let stems = list_stems_for_track(&pool, track_id).await.unwrap();
        assert_eq!(stems.len(), 2);
    }

    #[tokio::test]
    async fn test_get_stem_round_trip() {
        let pool = init_test_pool().await.unwrap();
        let record = stem(Uuid::new_v4(), StemKind::Bass);
        upsert_stem(&pool, &record).await.unwrap();
        let loaded = get_stem(&pool, record.id).await.unwrap().unwrap();
        assert_eq!(loaded.kind, StemKind::Bass);
        assert_eq!(loaded.quality, StemQuality::Draft);
    }
}
