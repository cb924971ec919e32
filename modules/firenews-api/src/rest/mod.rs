pub mod articles;
pub mod moderator;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use tracing::warn;

use firenews_common::FireError;

pub const DEFAULT_LIMIT: usize = 50;
pub const MAX_LIMIT: usize = 100;

#[derive(Deserialize)]
pub struct LimitQuery {
    limit: Option<usize>,
}

impl LimitQuery {
    /// Requested limit, defaulted and capped.
    pub fn clamped(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT)
    }
}

/// Map a workflow error to a status and `{"error": ...}` body. Collaborator
/// failures are logged with their detail and reported generically.
pub fn error_response(err: FireError, context: &str) -> Response {
    let (status, message) = match &err {
        FireError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        FireError::NotFound(_) => (StatusCode::NOT_FOUND, "Article not found".to_string()),
        FireError::Prediction(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to get FIRE score".to_string(),
        ),
        FireError::Storage { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Storage operation failed".to_string(),
        ),
    };

    if !err.is_client_error() {
        warn!(error = %err, "{context}");
    }

    (status, Json(serde_json::json!({ "error": message }))).into_response()
}
