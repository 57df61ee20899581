//! In-memory stand-ins for the external systems, shared by the unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use crate::analysis::ReportGenerator;
use crate::extraction::{ExtractError, OcrEngine, PageRasterizer, TextExtractor};
use crate::layout::ReportRenderer;
use crate::llm_client::{LlmError, TextCompletion};
use crate::models::{JobCandidateUpdate, NewCandidate};
use crate::pipeline::{AnalysisJob, AnalysisPipeline, PipelineComponents};
use crate::progress::{ProgressLog, ProgressStore, ProgressStoreError};
use crate::queue::{JobQueue, QueueError, QueuedTask, TaskState, TaskStatus};
use crate::repository::HrRepository;
use crate::retry::RetryPolicy;
use crate::storage::{ObjectStore, ReportUploader, ResumeFetcher, StorageError};

// ────────────────────────────────────────────────────────────────────────────
// Progress store
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryProgressStore {
    lists: Mutex<HashMap<String, Vec<String>>>,
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn append(&self, key: &str, value: String) -> Result<(), ProgressStoreError> {
        self.lists
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .push(value);
        Ok(())
    }

    async fn range(&self, key: &str) -> Result<Vec<String>, ProgressStoreError> {
        Ok(self.lists.lock().unwrap().get(key).cloned().unwrap_or_default())
    }
}

pub struct FailingProgressStore;

#[async_trait]
impl ProgressStore for FailingProgressStore {
    async fn append(&self, _key: &str, _value: String) -> Result<(), ProgressStoreError> {
        Err(ProgressStoreError::Unavailable("store offline".to_string()))
    }

    async fn range(&self, _key: &str) -> Result<Vec<String>, ProgressStoreError> {
        Err(ProgressStoreError::Unavailable("store offline".to_string()))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Object store
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, (Bytes, String)>>,
    failing_downloads: AtomicUsize,
    upload_statuses: Mutex<VecDeque<u16>>,
    download_calls: AtomicUsize,
    upload_calls: AtomicUsize,
}

impl MemoryObjectStore {
    pub fn with_object(self, path: &str, body: Bytes) -> Self {
        self.objects
            .lock()
            .unwrap()
            .insert(path.to_string(), (body, "application/octet-stream".to_string()));
        self
    }

    /// The next `n` downloads fail regardless of the path.
    pub fn fail_downloads(self, n: usize) -> Self {
        self.failing_downloads.store(n, Ordering::SeqCst);
        self
    }

    /// Statuses returned by the next uploads, in order; 200 afterwards.
    pub fn upload_statuses(self, statuses: Vec<u16>) -> Self {
        *self.upload_statuses.lock().unwrap() = statuses.into();
        self
    }

    pub fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    /// Body and content type stored at `path`.
    pub fn object(&self, path: &str) -> Option<(Bytes, String)> {
        self.objects.lock().unwrap().get(path).cloned()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn download(&self, path: &str) -> Result<Bytes, StorageError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);

        let remaining = self.failing_downloads.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_downloads.store(remaining - 1, Ordering::SeqCst);
            return Err(StorageError::Request("connection reset".to_string()));
        }

        self.objects
            .lock()
            .unwrap()
            .get(path)
            .map(|(body, _)| body.clone())
            .ok_or(StorageError::Status(404))
    }

    async fn upload(
        &self,
        path: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<u16, StorageError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);

        let status = self.upload_statuses.lock().unwrap().pop_front().unwrap_or(200);
        if (200..300).contains(&status) {
            self.objects
                .lock()
                .unwrap()
                .insert(path.to_string(), (body, content_type.to_string()));
        }
        Ok(status)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LLM
// ────────────────────────────────────────────────────────────────────────────

/// Replays scripted responses in order. Once the script is exhausted it returns
/// the `always` response, or `EmptyContent` when there is none.
pub struct ScriptedLlm {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    fallback: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new(script: Vec<Result<String, LlmError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn always(response: String) -> Self {
        Self {
            fallback: Some(response),
            ..Self::new(Vec::new())
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextCompletion for ScriptedLlm {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        if let Some(next) = self.script.lock().unwrap().pop_front() {
            return next;
        }
        self.fallback.clone().ok_or(LlmError::EmptyContent)
    }
}

/// A well-formed analysis in the prompt's output template.
/// `scores` are Skill Match, Work Experience, Relevant Projects and Education.
pub fn sample_llm_response(scores: [u8; 4], overall: f64) -> String {
    let [skills, work, projects, education] = scores;
    format!(
        "## Resume Analysis\n\
         Candidate Details:\n\
         - Name: Jane Doe\n\
         - Phone Number: +1 555 0100\n\
         - Email: jane.doe@example.com\n\
         - LinkedIn: https://linkedin.com/in/janedoe\n\
         - GitHub: Not provided\n\
         \n\
         Skill Match:\n\
         - Matches: Java (4 years at Acme), Spring Boot services\n\
         - Non-Matches: Kubernetes is not mentioned\n\
         - Summary: Strong backend core with a gap in orchestration.\n\
         - Score: {skills}/100 - Core stack matches\n\
         - Enhancement Tips: Add container orchestration experience.\n\
         \n\
         Work Experience:\n\
         - Matches: Four years building payment APIs at Acme\n\
         - Non-Matches: No team lead role\n\
         - Summary: Duration exceeds the three year requirement.\n\
         - Score: {work}/100 - Relevant tenure\n\
         - Enhancement Tips: Quantify service traffic and latency wins.\n\
         \n\
         Relevant Projects:\n\
         - Matches: Ledger reconciliation service in Spring Boot\n\
         - Non-Matches: No public cloud deployment described\n\
         - Summary: One project maps directly to the role.\n\
         - Score: {projects}/100 - Partial coverage\n\
         - Enhancement Tips: Describe a deployed cloud project.\n\
         \n\
         Education:\n\
         - Matches: BSc in Computer Science\n\
         - Non-Matches: None\n\
         - Summary: Degree requirement met.\n\
         - Score: {education}/100 - Requirement met\n\
         - Enhancement Tips: List relevant certifications.\n\
         \n\
         Overall Summary:\n\
         - Jane is a solid backend candidate.\n\
         Orchestration experience is the main gap.\n\
         - Overall Score: {overall}/100\n"
    )
}

// ────────────────────────────────────────────────────────────────────────────
// Rasterizer / OCR
// ────────────────────────────────────────────────────────────────────────────

/// Writes `page-<k>.png` containing `"page <k>"` for every page.
pub struct FakeRasterizer {
    pages: usize,
    without_image: HashSet<usize>,
    failing: HashSet<usize>,
    unreadable: bool,
}

impl FakeRasterizer {
    pub fn new(pages: usize) -> Self {
        Self {
            pages,
            without_image: HashSet::new(),
            failing: HashSet::new(),
            unreadable: false,
        }
    }

    /// A PDF whose page count cannot be read.
    pub fn unreadable() -> Self {
        Self {
            unreadable: true,
            ..Self::new(0)
        }
    }

    pub fn without_image(mut self, page: usize) -> Self {
        self.without_image.insert(page);
        self
    }

    pub fn failing_page(mut self, page: usize) -> Self {
        self.failing.insert(page);
        self
    }
}

#[async_trait]
impl PageRasterizer for FakeRasterizer {
    async fn page_count(&self, _pdf: &Path) -> Result<usize, ExtractError> {
        if self.unreadable {
            return Err(ExtractError::Pdf("invalid file header".to_string()));
        }
        Ok(self.pages)
    }

    async fn rasterize(
        &self,
        _pdf: &Path,
        page: usize,
        _dpi: u32,
        out_dir: &Path,
    ) -> Result<Option<PathBuf>, ExtractError> {
        if self.failing.contains(&page) {
            return Err(ExtractError::Tool {
                tool: "pdftoppm",
                status: "exit status: 1".to_string(),
                stderr: format!("Wrong page range given for page {page}"),
            });
        }
        if self.without_image.contains(&page) {
            return Ok(None);
        }
        let image = out_dir.join(format!("page-{page}.png"));
        tokio::fs::write(&image, format!("page {page}")).await?;
        Ok(Some(image))
    }
}

/// Reads the fake image back and answers `"text of <content>"`.
#[derive(Default)]
pub struct FakeOcr {
    failing: bool,
    seen: Mutex<Vec<String>>,
}

impl FakeOcr {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Contents of every image recognized so far.
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl OcrEngine for FakeOcr {
    async fn recognize(&self, image: &Path) -> Result<String, ExtractError> {
        if self.failing {
            return Err(ExtractError::Tool {
                tool: "tesseract",
                status: "exit status: 1".to_string(),
                stderr: "Error opening data file eng.traineddata".to_string(),
            });
        }
        let content = tokio::fs::read_to_string(image).await?;
        self.seen.lock().unwrap().push(content.clone());
        Ok(format!("text of {content}"))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Repository
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FakeJoinRecord {
    pub job_id: Uuid,
    pub candidate_id: Uuid,
    pub status: String,
    pub update: Option<JobCandidateUpdate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryCall {
    JobDescription,
    CandidateExists,
    InsertCandidate,
    JoinRecordExists,
    CompleteJoinRecord,
    MarkJoinRecordFailed,
}

#[derive(Default)]
pub struct FakeRepository {
    jobs: HashMap<Uuid, String>,
    candidates: Mutex<HashSet<Uuid>>,
    inserted: Mutex<Vec<NewCandidate>>,
    join_records: Mutex<HashMap<Uuid, FakeJoinRecord>>,
    failing: HashSet<RepositoryCall>,
}

impl FakeRepository {
    /// Every `call` fails as if the pool had timed out.
    pub fn failing(mut self, call: RepositoryCall) -> Self {
        self.failing.insert(call);
        self
    }

    fn check(&self, call: RepositoryCall) -> Result<(), sqlx::Error> {
        if self.failing.contains(&call) {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(())
    }

    pub fn with_job(mut self, job_id: Uuid, description: &str) -> Self {
        self.jobs.insert(job_id, description.to_string());
        self
    }

    pub fn with_candidate(self, candidate_id: Uuid) -> Self {
        self.candidates.lock().unwrap().insert(candidate_id);
        self
    }

    pub fn with_join_record(self, id: Uuid, job_id: Uuid, candidate_id: Uuid) -> Self {
        self.join_records.lock().unwrap().insert(
            id,
            FakeJoinRecord {
                job_id,
                candidate_id,
                status: "processing".to_string(),
                update: None,
            },
        );
        self
    }

    pub fn join_record(&self, id: Uuid) -> Option<FakeJoinRecord> {
        self.join_records.lock().unwrap().get(&id).cloned()
    }

    pub fn inserted_candidates(&self) -> Vec<NewCandidate> {
        self.inserted.lock().unwrap().clone()
    }
}

#[async_trait]
impl HrRepository for FakeRepository {
    async fn job_description(&self, job_id: Uuid) -> Result<Option<String>, sqlx::Error> {
        self.check(RepositoryCall::JobDescription)?;
        Ok(self.jobs.get(&job_id).cloned())
    }

    async fn candidate_exists(&self, candidate_id: Uuid) -> Result<bool, sqlx::Error> {
        self.check(RepositoryCall::CandidateExists)?;
        Ok(self.candidates.lock().unwrap().contains(&candidate_id))
    }

    async fn insert_candidate(&self, candidate: &NewCandidate) -> Result<(), sqlx::Error> {
        self.check(RepositoryCall::InsertCandidate)?;
        self.candidates.lock().unwrap().insert(candidate.id);
        self.inserted.lock().unwrap().push(candidate.clone());
        Ok(())
    }

    async fn join_record_exists(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        self.check(RepositoryCall::JoinRecordExists)?;
        Ok(self.join_records.lock().unwrap().contains_key(&id))
    }

    async fn complete_join_record(
        &self,
        id: Uuid,
        update: &JobCandidateUpdate,
    ) -> Result<(), sqlx::Error> {
        self.check(RepositoryCall::CompleteJoinRecord)?;
        if let Some(record) = self.join_records.lock().unwrap().get_mut(&id) {
            record.status = update.status.as_str().to_string();
            record.update = Some(update.clone());
        }
        Ok(())
    }

    async fn mark_join_record_failed(
        &self,
        job_id: Uuid,
        candidate_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        self.check(RepositoryCall::MarkJoinRecordFailed)?;
        let mut records = self.join_records.lock().unwrap();
        let mut updated = false;
        for record in records
            .values_mut()
            .filter(|r| r.job_id == job_id && r.candidate_id == candidate_id)
        {
            record.status = "failed".to_string();
            updated = true;
        }
        Ok(updated)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Queue
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryJobQueue {
    pending: Mutex<VecDeque<QueuedTask>>,
    statuses: Mutex<HashMap<Uuid, Vec<TaskStatus>>>,
    failing_status_writes: AtomicUsize,
    unavailable: bool,
}

impl MemoryJobQueue {
    /// Every call fails as if Redis were down.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// The next `n` calls to `set_status` fail. Enqueueing is unaffected.
    pub fn failing_status_writes(self, n: usize) -> Self {
        self.failing_status_writes.store(n, Ordering::SeqCst);
        self
    }

    /// Every status the task has been given, oldest first.
    pub fn history(&self, task_id: Uuid) -> Vec<TaskState> {
        self.statuses
            .lock()
            .unwrap()
            .get(&task_id)
            .map(|all| all.iter().map(|s| s.status).collect())
            .unwrap_or_default()
    }

    pub fn pending(&self) -> Vec<QueuedTask> {
        self.pending.lock().unwrap().iter().cloned().collect()
    }

    fn check(&self) -> Result<(), QueueError> {
        if self.unavailable {
            return Err(connection_refused());
        }
        Ok(())
    }

    fn push_status(&self, task_id: Uuid, status: &TaskStatus) {
        self.statuses
            .lock()
            .unwrap()
            .entry(task_id)
            .or_default()
            .push(status.clone());
    }
}

fn connection_refused() -> QueueError {
    QueueError::Redis(redis::RedisError::from((
        redis::ErrorKind::IoError,
        "connection refused",
    )))
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(&self, job: AnalysisJob) -> Result<Uuid, QueueError> {
        self.check()?;
        let task_id = Uuid::new_v4();
        self.push_status(task_id, &TaskStatus::queued());
        self.pending
            .lock()
            .unwrap()
            .push_back(QueuedTask { task_id, job });
        Ok(task_id)
    }

    async fn fetch_status(&self, task_id: Uuid) -> Result<Option<TaskStatus>, QueueError> {
        self.check()?;
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .get(&task_id)
            .and_then(|all| all.last().cloned()))
    }

    async fn dequeue(&self, _timeout: Duration) -> Result<Option<QueuedTask>, QueueError> {
        self.check()?;
        Ok(self.pending.lock().unwrap().pop_front())
    }

    async fn set_status(&self, task_id: Uuid, status: &TaskStatus) -> Result<(), QueueError> {
        self.check()?;
        let remaining = self.failing_status_writes.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_status_writes.store(remaining - 1, Ordering::SeqCst);
            return Err(connection_refused());
        }
        self.push_status(task_id, status);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Object path the healthy fake store serves a résumé from.
pub const SAMPLE_RESUME_PATH: &str = "resumes/jane.pdf";

/// A pipeline over healthy fakes with immediate retries. Only `repository` varies.
pub fn fake_pipeline(repository: Arc<FakeRepository>, scratch_dir: &Path) -> AnalysisPipeline {
    let progress = ProgressLog::new(Arc::new(MemoryProgressStore::default()));
    let store: Arc<dyn ObjectStore> = Arc::new(
        MemoryObjectStore::default()
            .with_object(SAMPLE_RESUME_PATH, Bytes::from_static(b"%PDF-1.4 resume")),
    );
    let llm: Arc<dyn TextCompletion> =
        Arc::new(ScriptedLlm::always(sample_llm_response([75, 85, 70, 90], 78.5)));
    let fast = RetryPolicy::immediate(3);

    let components = PipelineComponents {
        repository,
        fetcher: ResumeFetcher::new(store.clone()).with_retry_policy(fast),
        extractor: TextExtractor::new(
            Arc::new(FakeRasterizer::new(1)),
            Arc::new(FakeOcr::default()),
            progress.clone(),
            scratch_dir.to_path_buf(),
        ),
        generator: ReportGenerator::new(llm, progress.clone()).with_retry_policy(fast),
        renderer: ReportRenderer,
        uploader: ReportUploader::new(store, progress.clone()).with_retry_policy(fast),
        progress,
    };
    AnalysisPipeline::new(components, scratch_dir.to_path_buf(), "reports".to_string())
}
