//! HTTP API for automix-mx
//!
//! Thin request surface: validates input, resolves the caller, gates
//! quota, and pokes the supervisor. All heavy work happens on queue
//! workers; handlers only read the catalog and enqueue jobs.

pub mod auth;
pub mod health;
pub mod mashups;
pub mod sse;
pub mod stems;
pub mod styles;
pub mod tracks;

use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the service router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/status", get(health::status))
        .route("/api/events", get(sse::events))
        .route("/api/styles", get(styles::catalog))
        .route("/api/tracks", post(tracks::upload).get(tracks::list))
        .route("/api/tracks/:id", get(tracks::get))
        .route("/api/tracks/:id/stems", post(stems::request_separation).get(stems::list_for_track))
        .route("/api/stems/:id/stream", get(stems::stream))
        .route("/api/mashups", post(mashups::create))
        .route("/api/mashups/:id", get(mashups::get))
        .route("/api/mashups/:id/stream", get(mashups::stream))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API until the process shuts down
pub async fn run(state: AppState) -> anyhow::Result<()> {
    let port = state.config.port;
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("HTTP server listening on port {}", port);
    axum::serve(listener, app).await?;
    Ok(())
}
