use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use vidshim_comfyui::api::ComfyUIApiError;
use vidshim_core::error::CoreError;

/// Worker-level error type for startup, the local runner, and HTTP routes.
///
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// A domain-level error from `vidshim_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The ComfyUI HTTP client could not be built.
    #[error(transparent)]
    Client(#[from] ComfyUIApiError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The configured bind address could not be parsed.
    #[error("Invalid bind address: {0}")]
    InvalidAddress(String),
}

pub type WorkerResult<T> = Result<T, WorkerError>;

impl IntoResponse for WorkerError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            WorkerError::Core(CoreError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            WorkerError::Json(err) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", err.to_string()),
            other => {
                tracing::error!(error = %other, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
