//! Per-job progress log.
//!
//! Every pipeline stage appends entries here; the job-logs endpoint reads them back in
//! insertion order. Recording never fails the caller: a store error is logged and dropped.

pub mod store;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

pub use store::{ProgressStore, ProgressStoreError, RedisProgressStore};

/// Step tag of a progress entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Init,
    ResolveJobDescription,
    DownloadResume,
    ExtractText,
    GenerateReport,
    GenerateReportInput,
    GenerateReportOutput,
    GenerateReportParsed,
    GenerateReportError,
    EnsureCandidateRecord,
    CreateCandidate,
    SaveReportPdf,
    UploadReport,
    UploadError,
    UpdateJobCandidateStatus,
    Error,
    Cleanup,
    CleanupError,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Init => "init",
            Step::ResolveJobDescription => "resolve_job_description",
            Step::DownloadResume => "download_resume",
            Step::ExtractText => "extract_text",
            Step::GenerateReport => "generate_report",
            Step::GenerateReportInput => "generate_report_input",
            Step::GenerateReportOutput => "generate_report_output",
            Step::GenerateReportParsed => "generate_report_parsed",
            Step::GenerateReportError => "generate_report_error",
            Step::EnsureCandidateRecord => "ensure_candidate_record",
            Step::CreateCandidate => "create_candidate",
            Step::SaveReportPdf => "save_report_pdf",
            Step::UploadReport => "upload_report",
            Step::UploadError => "upload_error",
            Step::UpdateJobCandidateStatus => "update_job_candidate_status",
            Step::Error => "error",
            Step::Cleanup => "cleanup",
            Step::CleanupError => "cleanup_error",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One timestamped step record in a job's execution log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub step: Step,
    pub message: String,
    /// Structured details; `{}` when the step carries none.
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

/// Key of the Redis list holding a job's entries.
pub fn log_key(job_id: Uuid) -> String {
    format!("job_logs:{job_id}")
}

/// Append-only progress log shared by all pipeline components.
#[derive(Clone)]
pub struct ProgressLog {
    store: Arc<dyn ProgressStore>,
}

impl ProgressLog {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self { store }
    }

    /// Appends one entry for `job_id` and mirrors it to the tracing log.
    pub async fn record(
        &self,
        job_id: Uuid,
        step: Step,
        message: impl Into<String>,
        data: Option<Value>,
    ) {
        let entry = ProgressEntry {
            step,
            message: message.into(),
            data: data.unwrap_or_else(|| Value::Object(Default::default())),
            timestamp: Utc::now(),
        };

        info!(job_id = %job_id, step = %step, "{}", entry.message);

        let encoded = match serde_json::to_string(&entry) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(job_id = %job_id, step = %step, "Failed to encode progress entry: {e}");
                return;
            }
        };

        if let Err(e) = self.store.append(&log_key(job_id), encoded).await {
            warn!(job_id = %job_id, step = %step, "Failed to store progress entry: {e}");
        }
    }

    /// Returns all entries for `job_id` in insertion order.
    pub async fn entries(&self, job_id: Uuid) -> Result<Vec<ProgressEntry>, ProgressStoreError> {
        let raw = self.store.range(&log_key(job_id)).await?;
        Ok(raw
            .iter()
            .filter_map(|line| match serde_json::from_str::<ProgressEntry>(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(job_id = %job_id, "Skipping undecodable progress entry: {e}");
                    None
                }
            })
            .collect())
    }
}

/// Truncates `text` to at most `max_chars` characters for log previews.
pub fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
