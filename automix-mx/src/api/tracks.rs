//! Track upload and read endpoints

use crate::api::auth::UserId;
use crate::audio::decode::SUPPORTED_MIMES;
use crate::db::{self, tracks::Track};
use crate::error::{Error, Result};
use crate::state::AppState;
use crate::storage::{self, keys};
use automix_common::MixEvent;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;
use uuid::Uuid;

/// Largest accepted upload (60 MB covers an hour of 128 kbps MP3)
const MAX_UPLOAD_BYTES: usize = 60 * 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    /// Original file name
    pub name: String,
    /// Optional genre tag used by the planner's compatibility scoring
    pub genre: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackResponse {
    pub id: Uuid,
    pub original_name: String,
    pub mime: String,
    pub genre: Option<String>,
    pub analysis_status: String,
    pub bpm: Option<f64>,
    pub bpm_confidence: f64,
    pub key_signature: Option<String>,
    pub camelot_key: Option<String>,
    pub key_confidence: f64,
    pub duration_seconds: Option<f64>,
    pub beat_grid: Vec<f64>,
    pub drop_moments: Vec<f64>,
    pub waveform_lite: Vec<f64>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Track> for TrackResponse {
    fn from(track: Track) -> Self {
        Self {
            id: track.id,
            original_name: track.original_name,
            mime: track.mime,
            genre: track.genre,
            analysis_status: track.analysis_status.as_str().to_string(),
            bpm: track.bpm,
            bpm_confidence: track.bpm_confidence,
            key_signature: track.key_signature,
            camelot_key: track.camelot_key,
            key_confidence: track.key_confidence,
            duration_seconds: track.duration_seconds,
            beat_grid: track.beat_grid,
            drop_moments: track.drop_moments,
            waveform_lite: track.waveform_lite,
            created_at: track.created_at.to_rfc3339(),
            updated_at: track.updated_at.to_rfc3339(),
        }
    }
}

/// Sniff and gate the upload's container type
fn sniff_mime(bytes: &[u8]) -> Result<&'static str> {
    let detected = infer::get(bytes)
        .map(|t| t.mime_type())
        .ok_or_else(|| Error::Validation("unrecognized audio container".into()))?;
    let mime = match detected {
        "audio/mpeg" => "audio/mpeg",
        "audio/x-wav" | "audio/wav" => "audio/wav",
        other => {
            return Err(Error::Validation(format!(
                "unsupported container {other}; accepted: {}",
                SUPPORTED_MIMES.join(", ")
            )))
        }
    };
    Ok(mime)
}

/// POST /api/tracks?name=... - accept an upload and queue analysis
pub async fn upload(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<(StatusCode, Json<TrackResponse>)> {
    if body.is_empty() {
        return Err(Error::Validation("empty upload body".into()));
    }
    if body.len() > MAX_UPLOAD_BYTES {
        return Err(Error::Validation(format!(
            "upload exceeds {MAX_UPLOAD_BYTES} bytes"
        )));
    }
    let mime = sniff_mime(&body)?;
    let content_hash = format!("{:x}", Sha256::digest(&body));

    let storage_key = keys::upload_key(&user_id, Utc::now().timestamp_millis(), &params.name);
    storage::put_with_retry(state.store.as_ref(), &storage_key, &body, mime).await?;

    let track = Track::new_upload(
        &user_id,
        &params.name,
        mime,
        &storage_key,
        Some(content_hash),
        params.genre.clone(),
    );
    db::tracks::insert_track(&state.db, &track).await?;

    state.supervisor.enqueue_analyze(track.id);
    state.bus.emit_lossy(MixEvent::TrackUploaded {
        track_id: track.id,
        original_name: track.original_name.clone(),
        timestamp: Utc::now(),
    });

    info!(track_id = %track.id, name = %params.name, mime, bytes = body.len(), "upload accepted");
    Ok((StatusCode::CREATED, Json(track.into())))
}

/// GET /api/tracks - the caller's tracks
pub async fn list(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> Result<Json<Vec<TrackResponse>>> {
    let tracks = db::tracks::list_tracks(&state.db, &user_id).await?;
    Ok(Json(tracks.into_iter().map(TrackResponse::from).collect()))
}

/// GET /api/tracks/{id}
pub async fn get(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<Uuid>,
) -> Result<Json<TrackResponse>> {
    let track = db::tracks::get_track_owned(&state.db, id, &user_id).await?;
    Ok(Json(track.into()))
}
