mod analysis;
mod config;
mod db;
mod errors;
mod extraction;
mod layout;
mod llm_client;
mod models;
mod pipeline;
mod progress;
mod queue;
mod repository;
mod retry;
mod routes;
mod state;
mod storage;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::ReportGenerator;
use crate::config::Config;
use crate::db::create_pool;
use crate::extraction::{PopplerRasterizer, TesseractOcr, TextExtractor};
use crate::layout::ReportRenderer;
use crate::llm_client::LlmClient;
use crate::pipeline::{AnalysisPipeline, PipelineComponents};
use crate::progress::{ProgressLog, RedisProgressStore};
use crate::queue::{AnalysisWorker, RedisJobQueue};
use crate::repository::PgHrRepository;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::{ObjectStore, ReportUploader, ResumeFetcher, S3ObjectStore};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting validator v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize Redis
    let redis = redis::Client::open(config.redis_url.clone())?;
    let progress = ProgressLog::new(Arc::new(
        RedisProgressStore::connect(&redis)
            .await
            .context("Failed to connect progress store to Redis")?,
    ));
    info!("Redis client initialized");

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    let store: Arc<dyn ObjectStore> = Arc::new(S3ObjectStore::new(s3, config.s3_bucket.clone()));
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    // Initialize LLM client
    let llm = Arc::new(LlmClient::new(config.anthropic_api_key.clone())?);
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    tokio::fs::create_dir_all(&config.scratch_dir)
        .await
        .with_context(|| format!("Failed to create scratch dir {}", config.scratch_dir.display()))?;

    let components = PipelineComponents {
        repository: Arc::new(PgHrRepository::new(db)),
        fetcher: ResumeFetcher::new(store.clone()),
        extractor: TextExtractor::new(
            Arc::new(PopplerRasterizer),
            Arc::new(TesseractOcr),
            progress.clone(),
            config.scratch_dir.clone(),
        ),
        generator: ReportGenerator::new(llm, progress.clone()),
        renderer: ReportRenderer,
        uploader: ReportUploader::new(store, progress.clone()),
        progress: progress.clone(),
    };
    let pipeline = Arc::new(AnalysisPipeline::new(
        components,
        config.scratch_dir.clone(),
        config.report_path_prefix.clone(),
    ));

    // BLPOP blocks its connection, so each worker gets its own.
    for id in 0..config.worker_concurrency {
        let queue = RedisJobQueue::connect(&redis)
            .await
            .context("Failed to connect worker queue to Redis")?;
        let worker = AnalysisWorker::new(id, Arc::new(queue), pipeline.clone());
        tokio::spawn(worker.run());
    }
    info!("Started {} analysis workers", config.worker_concurrency);

    let queue = RedisJobQueue::connect(&redis)
        .await
        .context("Failed to connect job queue to Redis")?;
    let state = AppState {
        queue: Arc::new(queue),
        progress,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "validator-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    let s3_config = aws_sdk_s3::config::Builder::from(&s3_config)
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(s3_config)
}
