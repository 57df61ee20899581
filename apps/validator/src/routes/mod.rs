pub mod analysis;
pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/validate-candidate",
            post(analysis::handle_validate_candidate),
        )
        .route("/api/job-status/:task_id", get(analysis::handle_job_status))
        .route("/api/job-logs/:job_id", get(analysis::handle_job_logs))
        .with_state(state)
}
