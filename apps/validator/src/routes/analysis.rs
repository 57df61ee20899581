use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::pipeline::AnalysisJob;
use crate::progress::ProgressEntry;
use crate::queue::TaskStatus;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / response bodies
// ────────────────────────────────────────────────────────────────────────────

/// Every field is optional at the serde level so a missing one is reported as a
/// validation error rather than a JSON rejection.
#[derive(Debug, Deserialize)]
pub struct ValidateCandidateRequest {
    pub job_id: Option<String>,
    pub candidate_id: Option<String>,
    pub resume_url: Option<String>,
    pub job_description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateCandidateResponse {
    /// Id of the queued task, for polling `/api/job-status/:task_id`.
    pub job_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JobLogsResponse {
    pub logs: Vec<ProgressEntry>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/validate-candidate
/// Queues a résumé analysis and returns the task id (202).
pub async fn handle_validate_candidate(
    State(state): State<AppState>,
    Json(req): Json<ValidateCandidateRequest>,
) -> Result<(StatusCode, Json<ValidateCandidateResponse>), AppError> {
    let job = validate_request(req)?;
    let job_id = job.id;
    let candidate_id = job.candidate_id;

    let task_id = state
        .queue
        .enqueue(job)
        .await
        .map_err(|e| AppError::Queue(e.to_string()))?;

    info!(task_id = %task_id, job_id = %job_id, candidate_id = %candidate_id, "Analysis queued");
    Ok((
        StatusCode::ACCEPTED,
        Json(ValidateCandidateResponse { job_id: task_id }),
    ))
}

/// GET /api/job-status/:task_id
pub async fn handle_job_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskStatus>, AppError> {
    let task_id = parse_uuid("task_id", &task_id)?;

    let status = state
        .queue
        .fetch_status(task_id)
        .await
        .map_err(|e| AppError::Queue(e.to_string()))?
        .ok_or_else(|| AppError::NotFound(format!("Task {task_id} not found")))?;

    Ok(Json(status))
}

/// GET /api/job-logs/:job_id
/// Progress entries of every run for the job, oldest first.
pub async fn handle_job_logs(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobLogsResponse>, AppError> {
    let job_id = parse_uuid("job_id", &job_id)?;

    let logs = state
        .progress
        .entries(job_id)
        .await
        .map_err(anyhow::Error::from)?;

    Ok(Json(JobLogsResponse { logs }))
}

// ────────────────────────────────────────────────────────────────────────────
// Validation
// ────────────────────────────────────────────────────────────────────────────

fn validate_request(req: ValidateCandidateRequest) -> Result<AnalysisJob, AppError> {
    let job_id = required("job_id", req.job_id)?;
    let candidate_id = required("candidate_id", req.candidate_id)?;
    let resume_url = required("resume_url", req.resume_url)?;
    let job_description = required("job_description", req.job_description)?;

    Ok(AnalysisJob {
        id: parse_uuid("job_id", &job_id)?,
        candidate_id: parse_uuid("candidate_id", &candidate_id)?,
        resume_reference: resume_url,
        job_description,
    })
}

fn required(field: &str, value: Option<String>) -> Result<String, AppError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(AppError::Validation(format!("{field} is required"))),
    }
}

fn parse_uuid(field: &str, value: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(value.trim())
        .map_err(|_| AppError::Validation(format!("{field} must be a valid UUID")))
}
