//! Central error-to-HTTP mapping
//!
//! Every handler returns `Result<_, ApiError>`; this is the single place
//! where error kinds become status codes. Oversize payloads map to 400; all
//! other failures collapse to 500 with a `{"detail": ...}` body, the wire
//! shape existing clients already depend on.

use crate::error::RemovalError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

/// Request-boundary wrapper around [`RemovalError`]
#[derive(Debug)]
pub struct ApiError(pub RemovalError);

impl From<RemovalError> for ApiError {
    fn from(err: RemovalError) -> Self {
        Self(err)
    }
}

impl ApiError {
    /// HTTP status for this error kind
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self.0 {
            RemovalError::TooLarge { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = match &self.0 {
            RemovalError::TooLarge { .. } => self.0.to_string(),
            other => format!("Processing failed: {other}"),
        };
        error!(%status, "{detail}");
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
