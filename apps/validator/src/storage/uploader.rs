use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::errors::PipelineError;
use crate::progress::{ProgressLog, Step};
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::storage::{ObjectStore, StorageError};

const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Pushes rendered reports to object storage.
pub struct ReportUploader {
    store: Arc<dyn ObjectStore>,
    progress: ProgressLog,
    retry: RetryPolicy,
}

impl ReportUploader {
    pub fn new(store: Arc<dyn ObjectStore>, progress: ProgressLog) -> Self {
        Self {
            store,
            progress,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Uploads the file at `local_path` to `destination_path`.
    ///
    /// Any non-2xx status counts as a failed attempt and is logged as `upload_error`.
    pub async fn upload(
        &self,
        job_id: Uuid,
        local_path: &Path,
        destination_path: &str,
    ) -> Result<(), PipelineError> {
        retry_with_backoff(&self.retry, "upload_report", move |attempt| async move {
            let result = self.upload_once(local_path, destination_path).await;
            if let Err(e) = &result {
                self.progress
                    .record(
                        job_id,
                        Step::UploadError,
                        format!("Upload attempt {attempt} failed"),
                        Some(json!({
                            "attempt": attempt,
                            "destination": destination_path,
                            "error": e.to_string(),
                        })),
                    )
                    .await;
            }
            result
        })
        .await
        .map_err(|e| PipelineError::Upload(e.to_string()))
    }

    async fn upload_once(&self, local_path: &Path, destination: &str) -> Result<(), StorageError> {
        let body = Bytes::from(tokio::fs::read(local_path).await?);
        let size = body.len();
        let status = self.store.upload(destination, body, PDF_CONTENT_TYPE).await?;
        if !(200..300).contains(&status) {
            return Err(StorageError::Status(status));
        }
        info!("Uploaded report to {destination} ({size} bytes)");
        Ok(())
    }
}
