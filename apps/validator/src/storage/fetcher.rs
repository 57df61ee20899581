use std::path::{Path, PathBuf};
use std::sync::Arc;

use uuid::Uuid;

use crate::errors::PipelineError;
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::storage::{ObjectStore, StorageError};

/// Local scratch name for a downloaded résumé: `<job_id>_<candidate_id>_<basename>`.
///
/// Job and candidate qualify the name so concurrent runs never share a file.
pub fn scratch_file_name(job_id: Uuid, candidate_id: Uuid, remote_path: &str) -> String {
    let basename = remote_path
        .rsplit('/')
        .find(|part| !part.is_empty())
        .unwrap_or("resume.pdf");
    format!("{job_id}_{candidate_id}_{basename}")
}

/// Downloads résumés from object storage into scratch files.
pub struct ResumeFetcher {
    store: Arc<dyn ObjectStore>,
    retry: RetryPolicy,
}

impl ResumeFetcher {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Downloads `remote_path` and writes it to `local_path`, retrying the pair.
    pub async fn fetch(
        &self,
        job_id: Uuid,
        remote_path: &str,
        local_path: &Path,
    ) -> Result<PathBuf, PipelineError> {
        retry_with_backoff(&self.retry, "download_resume", move |_| async move {
            let body = self.store.download(remote_path).await?;
            tokio::fs::write(local_path, &body).await?;
            Ok::<_, StorageError>(())
        })
        .await
        .map_err(|e| PipelineError::Fetch(format!("job {job_id}: {e}")))?;

        Ok(local_path.to_path_buf())
    }
}
