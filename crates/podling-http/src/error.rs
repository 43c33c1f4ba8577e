use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// API error type for the worker's inbound surface.
#[derive(Debug)]
pub enum ApiError {
    /// Task or pod not found (404)
    NotFound(String),

    /// Invalid input (400)
    BadRequest(String),

    /// Internal server error (500)
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

impl From<podling_runtime::RuntimeError> for ApiError {
    fn from(err: podling_runtime::RuntimeError) -> Self {
        use podling_runtime::RuntimeError;

        match err {
            RuntimeError::TaskNotFound { .. } | RuntimeError::PodNotFound { .. } => {
                ApiError::NotFound(err.to_string())
            }
            RuntimeError::InvalidProbeTarget { .. } => ApiError::BadRequest(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::BadRequest(format!("JSON error: {err}"))
    }
}
