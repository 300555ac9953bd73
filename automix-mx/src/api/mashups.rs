//! Mix-creation and mashup read endpoints

use crate::api::auth::UserId;
use crate::db::{self, mashups::Mashup, tracks::AnalysisStatus};
use crate::error::{Error, Result};
use crate::plan::request::MixRequest;
use crate::quota;
use crate::state::AppState;
use crate::storage;
use automix_common::MixEvent;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct MashupResponse {
    pub id: Uuid,
    pub name: String,
    pub status: String,
    pub duration_seconds: i64,
    pub mix_mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_time_ms: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Mashup> for MashupResponse {
    fn from(mashup: Mashup) -> Self {
        Self {
            id: mashup.id,
            name: mashup.name,
            status: mashup.status.as_str().to_string(),
            duration_seconds: mashup.target_duration_seconds,
            mix_mode: mashup.mix_mode.as_str().to_string(),
            // A failed render never exposes a partial artifact
            output_key: mashup.output_key,
            quality: mashup.plan.as_ref().map(|p| p.quality.score),
            generation_time_ms: mashup.generation_time_ms,
            created_at: mashup.created_at.to_rfc3339(),
            updated_at: mashup.updated_at.to_rfc3339(),
        }
    }
}

/// POST /api/mashups - validate, gate, persist, and queue a mix
pub async fn create(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(request): Json<MixRequest>,
) -> Result<(StatusCode, Json<MashupResponse>)> {
    request.validate()?;

    // Every referenced track must be owned and fully analyzed
    for track_id in &request.track_ids {
        let track = db::tracks::get_track_owned(&state.db, *track_id, &user_id).await?;
        if track.analysis_status != AnalysisStatus::Completed {
            return Err(Error::AnalysisIncomplete(format!(
                "track {} is {}",
                track_id,
                track.analysis_status.as_str()
            )));
        }
    }

    quota::check_monthly_quota(
        &state.db,
        &user_id,
        request.target_duration_seconds,
        state.config.monthly_quota_seconds,
    )
    .await?;

    let name = request
        .name
        .clone()
        .unwrap_or_else(|| format!("Mix {}", Utc::now().format("%Y-%m-%d %H:%M")));
    let mashup = Mashup::new(&user_id, &name, request);
    db::mashups::insert_mashup(&state.db, &mashup).await?;

    state.supervisor.enqueue_plan(mashup.id);
    state.bus.emit_lossy(MixEvent::MashupQueued {
        mashup_id: mashup.id,
        track_count: mashup.track_ids.len(),
        timestamp: Utc::now(),
    });

    info!(
        mashup_id = %mashup.id,
        tracks = mashup.track_ids.len(),
        target_seconds = mashup.target_duration_seconds,
        "mix request accepted"
    );
    Ok((StatusCode::CREATED, Json(mashup.into())))
}

/// GET /api/mashups/{id}
pub async fn get(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<Uuid>,
) -> Result<Json<MashupResponse>> {
    let mashup = db::mashups::get_mashup_owned(&state.db, id, &user_id).await?;
    Ok(Json(mashup.into()))
}

/// GET /api/mashups/{id}/stream - the rendered mix
pub async fn stream(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let mashup = db::mashups::get_mashup_owned(&state.db, id, &user_id).await?;
    let output_key = mashup
        .output_key
        .ok_or_else(|| Error::NotFound(format!("mashup {id} has no output yet")))?;
    let object = storage::get_with_retry(state.store.as_ref(), &output_key).await?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("audio/mpeg"));
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("private, max-age=3600"),
    );
    Ok((headers, object.bytes))
}
