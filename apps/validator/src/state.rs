use std::sync::Arc;

use crate::progress::ProgressLog;
use crate::queue::JobQueue;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Enqueue side of the job queue. Workers hold their own connections.
    pub queue: Arc<dyn JobQueue>,
    pub progress: ProgressLog,
}
