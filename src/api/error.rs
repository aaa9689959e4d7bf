use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::pipeline::PipelineError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl AppError {
    /// Stable error kind surfaced to callers
    fn kind(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "invalid_request",
            AppError::Pipeline(PipelineError::Decryption(_)) => "decryption_failed",
            AppError::Pipeline(PipelineError::SourceNotFound { .. }) => "source_not_found",
            AppError::Pipeline(PipelineError::Transfer(_)) => "transfer_failed",
            AppError::Pipeline(PipelineError::Transcode(_)) => "transcode_failed",
            AppError::Pipeline(PipelineError::Upload(_)) => "upload_failed",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();

        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Pipeline(e @ PipelineError::SourceNotFound { .. }) => {
                (StatusCode::NOT_FOUND, e.to_string())
            }
            AppError::Pipeline(e @ PipelineError::Transcode(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
            }
            AppError::Pipeline(e @ (PipelineError::Transfer(_) | PipelineError::Upload(_))) => {
                tracing::error!("storage stage failed: {}", e);
                (StatusCode::BAD_GATEWAY, "storage operation failed".to_string())
            }
            AppError::Pipeline(PipelineError::Decryption(e)) => {
                tracing::error!("credential resolution failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "credential resolution failed".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": { "kind": kind, "message": message }
        }));

        (status, body).into_response()
    }
}
