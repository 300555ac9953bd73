//! Caller identity extraction
//!
//! Session derivation is external; by the time a request reaches this
//! service a trusted proxy has resolved the session into an `X-User-Id`
//! header. Requests without one are unauthenticated.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{request::Parts, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Header carrying the resolved caller id
pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated caller
#[derive(Debug, Clone)]
pub struct UserId(pub String);

/// Rejection for missing/empty caller identity
pub struct Unauthenticated;

impl IntoResponse for Unauthenticated {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": { "kind": "authentication", "message": "missing caller identity" } })),
        )
            .into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = Unauthenticated;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| UserId(v.to_string()))
            .ok_or(Unauthenticated)
    }
}
