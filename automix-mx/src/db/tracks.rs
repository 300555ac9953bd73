//! Track catalog operations

use crate::analysis::{AnalysisResult, Phrase, Section};
use crate::error::{Error, Result};
use crate::plan::cues::CuePoints;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Track analysis lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStatus {
    Pending,
    Analyzing,
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Analyzing => "analyzing",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AnalysisStatus::Pending),
            "analyzing" => Some(AnalysisStatus::Analyzing),
            "completed" => Some(AnalysisStatus::Completed),
            "failed" => Some(AnalysisStatus::Failed),
            _ => None,
        }
    }
}

/// Track record
///
/// Identity and storage fields are immutable after upload; analysis
/// fields fill in when the analyze job completes.
#[derive(Debug, Clone)]
pub struct Track {
    pub id: Uuid,
    pub user_id: String,
    pub original_name: String,
    pub mime: String,
    pub storage_key: String,
    pub content_hash: Option<String>,
    pub genre: Option<String>,
    pub bpm: Option<f64>,
    pub bpm_confidence: f64,
    pub key_signature: Option<String>,
    pub camelot_key: Option<String>,
    pub key_confidence: f64,
    pub duration_seconds: Option<f64>,
    pub beat_grid: Vec<f64>,
    pub phrases: Vec<Phrase>,
    pub structure: Vec<Section>,
    pub drop_moments: Vec<f64>,
    pub waveform_lite: Vec<f64>,
    pub cue_points: Option<CuePoints>,
    pub analysis_status: AnalysisStatus,
    pub analysis_version: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Track {
    /// Fresh record for an accepted upload
    pub fn new_upload(
        user_id: &str,
        original_name: &str,
        mime: &str,
        storage_key: &str,
        content_hash: Option<String>,
        genre: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            original_name: original_name.to_string(),
            mime: mime.to_string(),
            storage_key: storage_key.to_string(),
            content_hash,
            genre,
            bpm: None,
            bpm_confidence: 0.0,
            key_signature: None,
            camelot_key: None,
            key_confidence: 0.0,
            duration_seconds: None,
            beat_grid: Vec::new(),
            phrases: Vec::new(),
            structure: Vec::new(),
            drop_moments: Vec::new(),
            waveform_lite: Vec::new(),
            cue_points: None,
            analysis_status: AnalysisStatus::Pending,
            analysis_version: None,
            created_at: now,
            updated_at: now,
        }
    }
}

fn json_or_default<T: serde::de::DeserializeOwned + Default>(text: Option<String>) -> T {
    text.and_then(|t| serde_json::from_str(&t).ok())
        .unwrap_or_default()
}

fn json_opt<T: serde::de::DeserializeOwned>(text: Option<String>) -> Option<T> {
    text.and_then(|t| serde_json::from_str(&t).ok())
}

fn parse_timestamp(text: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_track(row: &sqlx::sqlite::SqliteRow) -> Result<Track> {
    let id_str: String = row.get("id");
    let id = Uuid::parse_str(&id_str).map_err(|e| Error::Other(e.into()))?;
    let status_str: String = row.get("analysis_status");
    let analysis_status = AnalysisStatus::parse(&status_str)
        .ok_or_else(|| Error::Other(anyhow::anyhow!("bad analysis_status {status_str:?}")))?;
    let created: String = row.get("created_at");
    let updated: String = row.get("updated_at");

    Ok(Track {
        id,
        user_id: row.get("user_id"),
        original_name: row.get("original_name"),
        mime: row.get("mime"),
        storage_key: row.get("storage_key"),
        content_hash: row.get("content_hash"),
        genre: row.get("genre"),
        bpm: row.get("bpm"),
        bpm_confidence: row.get("bpm_confidence"),
        key_signature: row.get("key_signature"),
        camelot_key: row.get("camelot_key"),
        key_confidence: row.get("key_confidence"),
        duration_seconds: row.get("duration_seconds"),
        beat_grid: json_or_default(row.get("beat_grid")),
        phrases: json_or_default(row.get("phrases")),
        structure: json_or_default(row.get("structure")),
        drop_moments: json_or_default(row.get("drop_moments")),
        waveform_lite: json_or_default(row.get("waveform_lite")),
        cue_points: json_opt(row.get("cue_points")),
        analysis_status,
        analysis_version: row.get("analysis_version"),
        created_at: parse_timestamp(&created),
        updated_at: parse_timestamp(&updated),
    })
}

/// Insert a new track row
pub async fn insert_track(pool: &SqlitePool, track: &Track) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO tracks (
            id, user_id, original_name, mime, storage_key, content_hash, genre,
            bpm_confidence, key_confidence, analysis_status, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, 0, 0, ?, ?, ?)
        "#,
    )
    .bind(track.id.to_string())
    .bind(&track.user_id)
    .bind(&track.original_name)
    .bind(&track.mime)
    .bind(&track.storage_key)
    .bind(&track.content_hash)
    .bind(&track.genre)
    .bind(track.analysis_status.as_str())
    .bind(track.created_at.to_rfc3339())
    .bind(track.updated_at.to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

/// Load a track by id
pub async fn get_track(pool: &SqlitePool, id: Uuid) -> Result<Option<Track>> {
    let row = sqlx::query("SELECT * FROM tracks WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(row_to_track).transpose()
}

/// Load a track owned by `user_id`; other users' tracks read as absent
pub async fn get_track_owned(pool: &SqlitePool, id: Uuid, user_id: &str) -> Result<Track> {
    match get_track(pool, id).await? {
        Some(track) if track.user_id == user_id => Ok(track),
        _ => Err(Error::NotFound(format!("track {id}"))),
    }
}

/// List a user's tracks, newest first
pub async fn list_tracks(pool: &SqlitePool, user_id: &str) -> Result<Vec<Track>> {
    let rows = sqlx::query("SELECT * FROM tracks WHERE user_id = ? ORDER BY created_at DESC")
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    rows.iter().map(row_to_track).collect()
}

/// Transition a track's analysis status
pub async fn set_analysis_status(pool: &SqlitePool, id: Uuid, status: AnalysisStatus) -> Result<()> {
    sqlx::query("UPDATE tracks SET analysis_status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(())
}

/// Persist a completed analysis onto its track row
pub async fn save_analysis(pool: &SqlitePool, id: Uuid, result: &AnalysisResult) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE tracks SET
            bpm = ?, bpm_confidence = ?,
            key_signature = ?, camelot_key = ?, key_confidence = ?,
            duration_seconds = ?,
            beat_grid = ?, phrases = ?, structure = ?, drop_moments = ?, waveform_lite = ?,
            analysis_status = 'completed', analysis_version = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(result.bpm)
    .bind(result.bpm_confidence)
    .bind(&result.key_signature)
    .bind(&result.camelot_key)
    .bind(result.key_confidence)
    .bind(result.duration_seconds)
    .bind(serde_json::to_string(&result.beat_grid).map_err(anyhow::Error::from)?)
    .bind(serde_json::to_string(&result.phrases).map_err(anyhow::Error::from)?)
    .bind(serde_json::to_string(&result.structure).map_err(anyhow::Error::from)?)
    .bind(serde_json::to_string(&result.drop_moments).map_err(anyhow::Error::from)?)
    .bind(serde_json::to_string(&result.waveform_lite).map_err(anyhow::Error::from)?)
    .bind(&result.analysis_version)
    .bind(Utc::now().to_rfc3339())
    .bind(id.to_string())
    .execute(pool)
    .await?;
    Ok(())
}

/// Persist recomputed cue points (heal-on-read)
pub async fn save_cue_points(pool: &SqlitePool, id: Uuid, cues: &CuePoints) -> Result<()> {
    sqlx::query("UPDATE tracks SET cue_points = ?, updated_at = ? WHERE id = ?")
        .bind(serde_json::to_string(cues).map_err(anyhow::Error::from)?)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(())
}

/// Tracks stuck before completion, for startup job resurrection
pub async fn list_unfinished_tracks(pool: &SqlitePool) -> Result<Vec<Track>> {
    let rows =
        sqlx::query("SELECT * FROM tracks WHERE analysis_status IN ('pending', 'analyzing')")
            .fetch_all(pool)
            .await?;
    rows.iter().map(row_to_track).collect()
}
