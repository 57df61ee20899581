use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::errors::PipelineError;
use crate::progress::{ProgressLog, Step};

/// Local files created during one pipeline run.
///
/// `cleanup` removes them and logs the outcome. If a run is abandoned before
/// `cleanup` is reached, `Drop` removes whatever is still registered.
#[derive(Debug, Default)]
pub struct ScratchFiles {
    paths: Vec<PathBuf>,
}

impl ScratchFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks `path` for removal and hands it back.
    pub fn register(&mut self, path: PathBuf) -> PathBuf {
        self.paths.push(path.clone());
        path
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Removes every registered file. Files that were never created are ignored.
    /// Failures are logged as `cleanup_error` and never returned.
    pub async fn cleanup(mut self, job_id: Uuid, progress: &ProgressLog) {
        let paths = std::mem::take(&mut self.paths);
        progress
            .record(
                job_id,
                Step::Cleanup,
                "Cleaning up temporary files",
                Some(json!({ "files": paths.len() })),
            )
            .await;

        let mut failures = Vec::new();
        for path in &paths {
            if let Err(e) = remove(path).await {
                failures.push(e);
            }
        }

        if failures.is_empty() {
            progress
                .record(job_id, Step::Cleanup, "Temporary files removed successfully", None)
                .await;
            return;
        }

        for e in failures {
            warn!(job_id = %job_id, "{e}");
            progress
                .record(
                    job_id,
                    Step::CleanupError,
                    e.to_string(),
                    Some(json!({ "error": e.to_string() })),
                )
                .await;
        }
    }
}

async fn remove(path: &Path) -> Result<(), PipelineError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PipelineError::Cleanup(format!("{}: {e}", path.display()))),
    }
}

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        for path in self.paths.drain(..) {
            let _ = std::fs::remove_file(&path);
        }
    }
}
