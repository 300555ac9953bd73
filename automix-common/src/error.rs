//! Common error types for automix

use thiserror::Error;

/// Common result type for automix operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error kinds across automix components
///
/// The kinds mirror how failures propagate: request-surface kinds
/// (Validation, Authorization, Quota, AnalysisIncomplete, NotFound) are
/// surfaced to callers; job-side kinds (Decode, Stem, Render, Storage)
/// only ever surface as an entity status transition.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not authorized: {0}")]
    Authorization(String),

    #[error("Quota exceeded: {0}")]
    Quota(String),

    #[error("Analysis not complete: {0}")]
    AnalysisIncomplete(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Stem separation error: {0}")]
    Stem(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Deadline exceeded: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
