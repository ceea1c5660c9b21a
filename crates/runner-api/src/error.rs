// API error taxonomy: maps storage/worker errors onto HTTP status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found")]
    NotFound,
    #[error("forbidden")]
    Forbidden,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<runner_storage::StorageError> for ApiError {
    fn from(err: runner_storage::StorageError) -> Self {
        match err {
            runner_storage::StorageError::RunNotFound(_)
            | runner_storage::StorageError::StepNotFound(_) => ApiError::NotFound,
            other => ApiError::Internal(other.into()),
        }
    }
}

impl From<runner_worker::WorkerError> for ApiError {
    fn from(err: runner_worker::WorkerError) -> Self {
        ApiError::Internal(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Internal(err) => {
                tracing::error!(error = %err, "internal error handling request");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
