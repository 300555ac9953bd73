//! Error types for the mix production service
//!
//! Request-surface errors map to HTTP statuses in one place
//! (`IntoResponse` below); job-side errors never reach a caller directly
//! and only surface as entity status transitions.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Result type for the service
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the mix production service
#[derive(Debug, Error)]
pub enum Error {
    /// Request outside enumerated/bounded ranges
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not owned by caller, or caller unidentified
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Monthly quota would be exceeded
    #[error("Quota exceeded: {0}")]
    Quota(String),

    /// A referenced track's analysis is not complete
    #[error("Analysis in progress: {0}")]
    AnalysisIncomplete(String),

    /// Entity does not exist (also used to mask other users' entities)
    #[error("Not found: {0}")]
    NotFound(String),

    /// PCM decode failures
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Stem separation failures (all engines exhausted)
    #[error("Stem separation error: {0}")]
    Stem(String),

    /// Render failures (main and fallback graph both failed)
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Object store failures after retries
    #[error("Storage error: {0}")]
    Storage(String),

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Errors from the external transcoder decode path
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Transcoder binary not found at the configured path
    #[error("Transcoder binary not found: {path}")]
    BinaryMissing { path: String },

    /// Container/mime not supported
    #[error("Unsupported container: {mime}")]
    UnsupportedContainer { mime: String },

    /// Transcoder exited nonzero or produced no usable output
    #[error("Transcoder failed: {detail}")]
    TranscoderFailed { detail: String },

    /// Stream truncated beyond the first frame
    #[error("Truncated stream after {frames_decoded} frames")]
    TruncatedStream { frames_decoded: usize },

    /// Decode deadline exceeded
    #[error("Decode timed out after {seconds}s")]
    Timeout { seconds: u64 },
}

/// Errors from filter graph execution
#[derive(Debug, Error)]
pub enum RenderError {
    /// Filter graph process exited nonzero
    #[error("Filter graph failed: {detail}")]
    GraphFailed { detail: String },

    /// Render deadline exceeded
    #[error("Render timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Plan references a track with no source buffer
    #[error("Missing source for track {track_id}")]
    MissingSource { track_id: uuid::Uuid },

    /// Both the main and fallback graphs failed
    #[error("Fallback graph also failed: {detail}")]
    FallbackFailed { detail: String },
}

impl Error {
    /// HTTP status this error surfaces as
    fn status(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Authorization(_) => StatusCode::FORBIDDEN,
            Error::Quota(_) => StatusCode::PAYMENT_REQUIRED,
            Error::AnalysisIncomplete(_) => StatusCode::CONFLICT,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable error kind
    fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::Authorization(_) => "authorization",
            Error::Quota(_) => "quota",
            Error::AnalysisIncomplete(_) => "analysis-in-progress",
            Error::NotFound(_) => "not-found",
            Error::Decode(_) => "decode",
            Error::Stem(_) => "stem-engine",
            Error::Render(_) => "render",
            Error::Storage(_) => "storage",
            _ => "internal",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        // Internal detail stays in the log, not the response body
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
            return (
                status,
                Json(json!({ "error": { "kind": "internal", "message": "internal error" } })),
            )
                .into_response();
        }
        (
            status,
            Json(json!({ "error": { "kind": self.kind(), "message": self.to_string() } })),
        )
            .into_response()
    }
}

impl From<automix_common::Error> for Error {
    fn from(err: automix_common::Error) -> Self {
        use automix_common::Error as C;
        match err {
            C::Validation(m) => Error::Validation(m),
            C::Authorization(m) => Error::Authorization(m),
            C::Quota(m) => Error::Quota(m),
            C::AnalysisIncomplete(m) => Error::AnalysisIncomplete(m),
            C::NotFound(m) => Error::NotFound(m),
            C::Database(e) => Error::Database(e),
            C::Io(e) => Error::Io(e),
            C::Config(m) => Error::Config(m),
            C::Decode(m) => Error::Decode(DecodeError::TranscoderFailed { detail: m }),
            C::Stem(m) => Error::Stem(m),
            C::Render(m) => Error::Render(RenderError::GraphFailed { detail: m }),
            C::Storage(m) => Error::Storage(m),
            C::Timeout(m) => Error::Other(anyhow::anyhow!("deadline exceeded: {m}")),
            C::Internal(m) => Error::Other(anyhow::anyhow!(m)),
        }
    }
}
