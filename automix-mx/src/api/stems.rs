//! Stem separation trigger and stem streaming

use crate::api::auth::UserId;
use crate::db;
use crate::error::{Error, Result};
use crate::state::AppState;
use crate::storage;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StemResponse {
    pub id: Uuid,
    pub track_id: Uuid,
    pub kind: String,
    pub status: String,
    pub quality: String,
    pub engine: Option<String>,
}

impl From<db::stems::StemRecord> for StemResponse {
    fn from(stem: db::stems::StemRecord) -> Self {
        Self {
            id: stem.id,
            track_id: stem.track_id,
            kind: stem.kind.as_str().to_string(),
            status: stem.status.as_str().to_string(),
            quality: stem.quality.as_str().to_string(),
            engine: stem.engine,
        }
    }
}

/// POST /api/tracks/{id}/stems - enqueue separation for a track
pub async fn request_separation(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(track_id): Path<Uuid>,
) -> Result<StatusCode> {
    // Ownership check; separation itself is independent of analysis
    db::tracks::get_track_owned(&state.db, track_id, &user_id).await?;
    state.supervisor.enqueue_separate(track_id);
    Ok(StatusCode::ACCEPTED)
}

/// GET /api/tracks/{id}/stems - stem records for a track
pub async fn list_for_track(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(track_id): Path<Uuid>,
) -> Result<Json<Vec<StemResponse>>> {
    db::tracks::get_track_owned(&state.db, track_id, &user_id).await?;
    let stems = db::stems::list_stems_for_track(&state.db, track_id).await?;
    Ok(Json(stems.into_iter().map(StemResponse::from).collect()))
}

/// GET /api/stems/{id}/stream - raw stem bytes
pub async fn stream(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(stem_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let stem = db::stems::get_stem(&state.db, stem_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("stem {stem_id}")))?;
    // Stems are owned through their track
    db::tracks::get_track_owned(&state.db, stem.track_id, &user_id).await?;

    let key = stem
        .storage_key
        .ok_or_else(|| Error::NotFound(format!("stem {stem_id} has no content")))?;
    let object = storage::get_with_retry(state.store.as_ref(), &key).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&object.mime)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("private, max-age=3600"),
    );
    Ok((headers, object.bytes))
}
