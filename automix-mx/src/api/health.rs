//! Liveness and status endpoints

use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

/// GET /health - liveness probe
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// GET /status - service identity and queue depth
pub async fn status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "service": "automix-mx",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "queue_depth": state.queue.depth(),
        "jobs_running": state.queue.running(),
    }))
}
