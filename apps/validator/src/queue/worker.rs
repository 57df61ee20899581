use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, info_span, warn, Instrument};

use crate::pipeline::AnalysisPipeline;
use crate::queue::{JobQueue, QueueError, TaskStatus};
use crate::retry::{retry_with_backoff, RetryPolicy};

/// How long one BLPOP waits before the loop polls again.
pub const POLL_TIMEOUT: Duration = Duration::from_secs(5);
/// Pause after a queue error before polling again.
pub const ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Pops tasks off the queue and runs them through the pipeline, one at a time.
///
/// Once a task is popped it always runs: status writes never abort it. The final
/// status write is retried so the result is not lost to a transient Redis error.
pub struct AnalysisWorker {
    id: usize,
    queue: Arc<dyn JobQueue>,
    pipeline: Arc<AnalysisPipeline>,
    status_retry: RetryPolicy,
}

impl AnalysisWorker {
    pub fn new(id: usize, queue: Arc<dyn JobQueue>, pipeline: Arc<AnalysisPipeline>) -> Self {
        Self {
            id,
            queue,
            pipeline,
            status_retry: RetryPolicy::default(),
        }
    }

    pub fn with_status_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.status_retry = retry;
        self
    }

    /// Runs until the process exits.
    pub async fn run(self) {
        info!(worker = self.id, "Analysis worker started");
        loop {
            if let Err(e) = self.run_once(POLL_TIMEOUT).await {
                warn!(worker = self.id, "Queue error: {e}");
                tokio::time::sleep(ERROR_BACKOFF).await;
            }
        }
    }

    /// Processes at most one task. Returns whether a task was processed.
    ///
    /// Only the dequeue itself can fail this call.
    pub async fn run_once(&self, poll_timeout: Duration) -> Result<bool, QueueError> {
        let Some(task) = self.queue.dequeue(poll_timeout).await? else {
            return Ok(false);
        };

        let span = info_span!(
            "analysis_task",
            worker = self.id,
            task_id = %task.task_id,
            job_id = %task.job.id,
            candidate_id = %task.job.candidate_id,
        );

        async {
            if let Err(e) = self
                .queue
                .set_status(task.task_id, &TaskStatus::started())
                .await
            {
                warn!("Failed to mark task as started, running it anyway: {e}");
            }

            let result = self.pipeline.run(&task.job).await;
            info!(status = ?result.status, "Analysis task done");

            let status = TaskStatus::completed(result);
            let stored = retry_with_backoff(&self.status_retry, "store_task_status", |_| {
                self.queue.set_status(task.task_id, &status)
            })
            .await;
            if let Err(e) = stored {
                error!("Failed to store final task status: {e}");
            }
        }
        .instrument(span)
        .await;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{AnalysisJob, PipelineStatus};
    use crate::queue::TaskState;
    use crate::testing::{fake_pipeline, FakeRepository, MemoryJobQueue};
    use uuid::Uuid;

    fn job() -> AnalysisJob {
        AnalysisJob {
            id: Uuid::new_v4(),
            candidate_id: Uuid::new_v4(),
            resume_reference: "resumes/jane.pdf".to_string(),
            job_description: "Backend engineer".to_string(),
        }
    }

    fn repository_for(job: &AnalysisJob) -> Arc<FakeRepository> {
        Arc::new(
            FakeRepository::default()
                .with_job(job.id, "Backend engineer")
                .with_join_record(job.candidate_id, job.id, job.candidate_id),
        )
    }

    #[tokio::test]
    async fn test_processes_task_and_records_final_status() {
        let scratch = tempfile::tempdir().unwrap();
        let job = job();
        let pipeline = Arc::new(fake_pipeline(repository_for(&job), scratch.path()));
        let queue = Arc::new(MemoryJobQueue::default());
        let worker = AnalysisWorker::new(0, queue.clone(), pipeline);

        let task_id = queue.enqueue(job.clone()).await.unwrap();
        assert!(worker.run_once(Duration::ZERO).await.unwrap());

        let status = queue.fetch_status(task_id).await.unwrap().unwrap();
        assert_eq!(status.status, TaskState::Finished);
        let result = status.result.unwrap();
        assert_eq!(result.status, PipelineStatus::Finished);
        assert_eq!(result.candidate_id, job.candidate_id);
        assert_eq!(
            queue.history(task_id),
            vec![TaskState::Queued, TaskState::Started, TaskState::Finished]
        );
    }

    #[tokio::test]
    async fn test_failed_run_is_recorded_as_failed_task() {
        let scratch = tempfile::tempdir().unwrap();
        let pipeline = Arc::new(fake_pipeline(Arc::default(), scratch.path()));
        let queue = Arc::new(MemoryJobQueue::default());
        let worker = AnalysisWorker::new(0, queue.clone(), pipeline);

        let task_id = queue.enqueue(job()).await.unwrap();
        worker.run_once(Duration::ZERO).await.unwrap();

        let status = queue.fetch_status(task_id).await.unwrap().unwrap();
        assert_eq!(status.status, TaskState::Failed);
        assert!(status.result.unwrap().error.unwrap().contains("not found in hr_jobs"));
    }

    #[tokio::test]
    async fn test_empty_queue_returns_false() {
        let scratch = tempfile::tempdir().unwrap();
        let pipeline = Arc::new(fake_pipeline(Arc::default(), scratch.path()));
        let worker = AnalysisWorker::new(0, Arc::new(MemoryJobQueue::default()), pipeline);

        assert!(!worker.run_once(Duration::ZERO).await.unwrap());
    }

    #[tokio::test]
    async fn test_task_still_runs_when_started_status_cannot_be_written() {
        let scratch = tempfile::tempdir().unwrap();
        let job = job();
        let repository = repository_for(&job);
        let pipeline = Arc::new(fake_pipeline(repository.clone(), scratch.path()));
        let queue = Arc::new(MemoryJobQueue::default().failing_status_writes(1));
        let worker = AnalysisWorker::new(0, queue.clone(), pipeline);

        let task_id = queue.enqueue(job.clone()).await.unwrap();
        assert!(worker.run_once(Duration::ZERO).await.unwrap());

        assert_eq!(
            queue.history(task_id),
            vec![TaskState::Queued, TaskState::Finished]
        );
        assert_eq!(
            repository.join_record(job.candidate_id).unwrap().status,
            "finished"
        );
    }

    #[tokio::test]
    async fn test_final_status_write_is_retried() {
        let scratch = tempfile::tempdir().unwrap();
        let job = job();
        let pipeline = Arc::new(fake_pipeline(repository_for(&job), scratch.path()));
        // Started write plus the first two final attempts.
        let queue = Arc::new(MemoryJobQueue::default().failing_status_writes(3));
        let worker = AnalysisWorker::new(0, queue.clone(), pipeline)
            .with_status_retry_policy(RetryPolicy::immediate(3));

        let task_id = queue.enqueue(job).await.unwrap();
        assert!(worker.run_once(Duration::ZERO).await.unwrap());

        let status = queue.fetch_status(task_id).await.unwrap().unwrap();
        assert_eq!(status.status, TaskState::Finished);
        assert_eq!(status.result.unwrap().status, PipelineStatus::Finished);
    }

    #[tokio::test]
    async fn test_lost_status_writes_do_not_fail_the_worker() {
        let scratch = tempfile::tempdir().unwrap();
        let job = job();
        let repository = repository_for(&job);
        let pipeline = Arc::new(fake_pipeline(repository.clone(), scratch.path()));
        let queue = Arc::new(MemoryJobQueue::default().failing_status_writes(usize::MAX));
        let worker = AnalysisWorker::new(0, queue.clone(), pipeline)
            .with_status_retry_policy(RetryPolicy::immediate(2));

        let task_id = queue.enqueue(job.clone()).await.unwrap();
        assert!(worker.run_once(Duration::ZERO).await.unwrap());

        assert_eq!(queue.history(task_id), vec![TaskState::Queued]);
        assert!(queue.pending().is_empty());
        assert_eq!(
            repository.join_record(job.candidate_id).unwrap().status,
            "finished"
        );
    }
}
