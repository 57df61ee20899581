use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// HTTP-facing error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Queue(msg) => {
                tracing::error!("Queue error: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "QUEUE_ERROR",
                    "The job queue is unavailable".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

/// Failure of one analysis pipeline run.
///
/// Every stage returns this type; `AnalysisPipeline::run` is the only place that
/// matches on it. `Cleanup` never aborts a run, it is only logged.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to download resume from storage: {0}")]
    Fetch(String),

    #[error("Failed to determine PDF page count: {0}")]
    PageCount(String),

    #[error("Failed to extract text from PDF: {0}")]
    Extraction(String),

    #[error("Failed to generate report: {0}")]
    Generation(String),

    #[error("Failed to save report as PDF: {0}")]
    Render(String),

    #[error("Failed to upload report to storage: {0}")]
    Upload(String),

    #[error("Job {0} not found in hr_jobs")]
    JobNotFound(Uuid),

    #[error("No hr_job_candidates record found for id: {0}")]
    JoinRecordMissing(Uuid),

    #[error("Failed to clean up temporary files: {0}")]
    Cleanup(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
