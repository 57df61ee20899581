//! Redis-backed job queue.
//!
//! Tasks are JSON payloads on the `analysis_queue` list (RPUSH / BLPOP). Each task
//! has a status document under `analysis_task:<task_id>` that the job-status
//! endpoint reads. A blocking BLPOP holds its connection, so every worker should
//! own its own `RedisJobQueue`.

pub mod worker;

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::pipeline::{AnalysisJob, PipelineResult, PipelineStatus};

pub use worker::AnalysisWorker;

pub const QUEUE_KEY: &str = "analysis_queue";

/// Status documents expire a day after their last update.
const STATUS_TTL_SECS: u64 = 24 * 60 * 60;

pub fn task_key(task_id: Uuid) -> String {
    format!("analysis_task:{task_id}")
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Invalid task payload: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Queued,
    Started,
    Finished,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub status: TaskState,
    /// Set once the pipeline has run.
    pub result: Option<PipelineResult>,
}

impl TaskStatus {
    pub fn queued() -> Self {
        Self {
            status: TaskState::Queued,
            result: None,
        }
    }

    pub fn started() -> Self {
        Self {
            status: TaskState::Started,
            result: None,
        }
    }

    /// Final status; the task state mirrors the pipeline outcome.
    pub fn completed(result: PipelineResult) -> Self {
        let status = match result.status {
            PipelineStatus::Finished => TaskState::Finished,
            PipelineStatus::Failed => TaskState::Failed,
        };
        Self {
            status,
            result: Some(result),
        }
    }
}

/// Queue payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedTask {
    pub task_id: Uuid,
    pub job: AnalysisJob,
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Queues `job` and returns its task id.
    async fn enqueue(&self, job: AnalysisJob) -> Result<Uuid, QueueError>;

    /// `None` for unknown (or expired) task ids.
    async fn fetch_status(&self, task_id: Uuid) -> Result<Option<TaskStatus>, QueueError>;

    /// Waits up to `timeout` for the next task.
    async fn dequeue(&self, timeout: Duration) -> Result<Option<QueuedTask>, QueueError>;

    async fn set_status(&self, task_id: Uuid, status: &TaskStatus) -> Result<(), QueueError>;
}

#[derive(Clone)]
pub struct RedisJobQueue {
    connection: MultiplexedConnection,
}

impl RedisJobQueue {
    pub async fn connect(client: &redis::Client) -> Result<Self, QueueError> {
        let connection = client.get_multiplexed_async_connection().await?;
        Ok(Self { connection })
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn enqueue(&self, job: AnalysisJob) -> Result<Uuid, QueueError> {
        let task_id = Uuid::new_v4();
        let job_id = job.id;
        let payload = serde_json::to_string(&QueuedTask { task_id, job })?;

        self.set_status(task_id, &TaskStatus::queued()).await?;

        let mut connection = self.connection.clone();
        redis::cmd("RPUSH")
            .arg(QUEUE_KEY)
            .arg(payload)
            .query_async::<_, ()>(&mut connection)
            .await?;

        info!(task_id = %task_id, job_id = %job_id, "Enqueued analysis task");
        Ok(task_id)
    }

    async fn fetch_status(&self, task_id: Uuid) -> Result<Option<TaskStatus>, QueueError> {
        let mut connection = self.connection.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(task_key(task_id))
            .query_async(&mut connection)
            .await?;
        raw.map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(QueueError::from)
    }

    async fn dequeue(&self, timeout: Duration) -> Result<Option<QueuedTask>, QueueError> {
        let mut connection = self.connection.clone();
        let popped: Option<(String, String)> = redis::cmd("BLPOP")
            .arg(QUEUE_KEY)
            .arg(timeout.as_secs_f64())
            .query_async(&mut connection)
            .await?;

        match popped {
            Some((_, payload)) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    async fn set_status(&self, task_id: Uuid, status: &TaskStatus) -> Result<(), QueueError> {
        let mut connection = self.connection.clone();
        redis::cmd("SET")
            .arg(task_key(task_id))
            .arg(serde_json::to_string(status)?)
            .arg("EX")
            .arg(STATUS_TTL_SECS)
            .query_async::<_, ()>(&mut connection)
            .await?;
        Ok(())
    }
}
