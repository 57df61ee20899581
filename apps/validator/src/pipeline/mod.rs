//! Analysis pipeline: one résumé validated against one job, start to finish.
//!
//! Flow: resolve_job_description → download_resume → extract_text →
//!       generate_report → ensure_candidate_record → save_report_pdf →
//!       upload_report → update_job_candidate_status, then cleanup.
//!
//! Stages run strictly in order and all return `Result<_, PipelineError>`.
//! `run` is the only place that matches on a stage failure.

pub mod scratch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::analysis::{AnalysisReport, ReportGenerator};
use crate::errors::PipelineError;
use crate::extraction::TextExtractor;
use crate::layout::ReportRenderer;
use crate::models::{JobCandidateUpdate, NewCandidate};
use crate::progress::{ProgressLog, Step};
use crate::repository::HrRepository;
use crate::storage::fetcher::scratch_file_name;
use crate::storage::{ReportUploader, ResumeFetcher};

pub use scratch::ScratchFiles;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// One unit of work. Immutable once enqueued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisJob {
    /// `hr_jobs.id`; also the key of the job's progress log.
    pub id: Uuid,
    pub candidate_id: Uuid,
    /// Object path of the résumé PDF in the bucket.
    pub resume_reference: String,
    /// Caller-supplied description. The `hr_jobs` row takes precedence.
    pub job_description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    Finished,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub status: PipelineStatus,
    pub candidate_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PipelineResult {
    pub fn finished(candidate_id: Uuid) -> Self {
        Self {
            status: PipelineStatus::Finished,
            candidate_id,
            error: None,
        }
    }

    pub fn failed(candidate_id: Uuid, error: String) -> Self {
        Self {
            status: PipelineStatus::Failed,
            candidate_id,
            error: Some(error),
        }
    }
}

/// Stage implementations the pipeline is assembled from.
pub struct PipelineComponents {
    pub repository: Arc<dyn HrRepository>,
    pub fetcher: ResumeFetcher,
    pub extractor: TextExtractor,
    pub generator: ReportGenerator,
    pub renderer: ReportRenderer,
    pub uploader: ReportUploader,
    pub progress: ProgressLog,
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

pub struct AnalysisPipeline {
    repository: Arc<dyn HrRepository>,
    fetcher: ResumeFetcher,
    extractor: TextExtractor,
    generator: ReportGenerator,
    renderer: ReportRenderer,
    uploader: ReportUploader,
    progress: ProgressLog,
    scratch_dir: PathBuf,
    report_path_prefix: String,
}

impl AnalysisPipeline {
    pub fn new(components: PipelineComponents, scratch_dir: PathBuf, report_path_prefix: String) -> Self {
        Self {
            repository: components.repository,
            fetcher: components.fetcher,
            extractor: components.extractor,
            generator: components.generator,
            renderer: components.renderer,
            uploader: components.uploader,
            progress: components.progress,
            scratch_dir,
            report_path_prefix: report_path_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Runs every stage for `job`. Never returns an error: failures are logged,
    /// reflected on the `hr_job_candidates` row when possible, and reported in the
    /// returned result. Scratch files are removed either way.
    pub async fn run(&self, job: &AnalysisJob) -> PipelineResult {
        let mut scratch = ScratchFiles::new();

        self.progress
            .record(
                job.id,
                Step::Init,
                "Task started",
                Some(json!({
                    "candidate_id": job.candidate_id,
                    "resume_reference": job.resume_reference,
                })),
            )
            .await;

        let result = match self.execute(job, &mut scratch).await {
            Ok(()) => {
                info!(job_id = %job.id, candidate_id = %job.candidate_id, "Analysis finished");
                PipelineResult::finished(job.candidate_id)
            }
            Err(e) => {
                error!(job_id = %job.id, candidate_id = %job.candidate_id, "Analysis failed: {e}");
                self.progress
                    .record(
                        job.id,
                        Step::Error,
                        format!("Task failed: {e}"),
                        Some(json!({ "error": e.to_string() })),
                    )
                    .await;
                self.mark_failed(job).await;
                PipelineResult::failed(job.candidate_id, e.to_string())
            }
        };

        scratch.cleanup(job.id, &self.progress).await;
        result
    }

    async fn execute(&self, job: &AnalysisJob, scratch: &mut ScratchFiles) -> Result<(), PipelineError> {
        let job_description = self.resolve_job_description(job).await?;
        let resume_path = self.download_resume(job, scratch).await?;
        let resume_text = self.extract_text(job, &resume_path).await?;
        let report = self.generate_report(job, &resume_text, &job_description).await?;
        self.ensure_candidate_record(job, &report).await?;
        let report_path = self.save_report_pdf(job, &report, scratch).await?;
        self.upload_report(job, &report_path).await?;
        self.update_job_candidate_status(job, &report).await
    }

    // ── stages ──────────────────────────────────────────────────────────────

    async fn resolve_job_description(&self, job: &AnalysisJob) -> Result<String, PipelineError> {
        self.progress
            .record(
                job.id,
                Step::ResolveJobDescription,
                "Fetching job description from database",
                None,
            )
            .await;

        let description = self
            .repository
            .job_description(job.id)
            .await?
            .ok_or(PipelineError::JobNotFound(job.id))?;

        if description != job.job_description {
            info!(job_id = %job.id, "Using stored job description instead of the submitted one");
        }

        self.progress
            .record(
                job.id,
                Step::ResolveJobDescription,
                "Job description retrieved",
                Some(json!({ "description_length": description.len() })),
            )
            .await;
        Ok(description)
    }

    async fn download_resume(
        &self,
        job: &AnalysisJob,
        scratch: &mut ScratchFiles,
    ) -> Result<PathBuf, PipelineError> {
        self.progress
            .record(
                job.id,
                Step::DownloadResume,
                "Downloading resume from storage",
                Some(json!({ "resume_reference": job.resume_reference })),
            )
            .await;

        let local = scratch.register(self.scratch_dir.join(scratch_file_name(
            job.id,
            job.candidate_id,
            &job.resume_reference,
        )));
        let path = self
            .fetcher
            .fetch(job.id, &job.resume_reference, &local)
            .await?;

        let size = tokio::fs::metadata(&path).await.map(|m| m.len()).unwrap_or(0);
        self.progress
            .record(
                job.id,
                Step::DownloadResume,
                "Resume downloaded successfully",
                Some(json!({ "resume_size": size })),
            )
            .await;
        Ok(path)
    }

    async fn extract_text(&self, job: &AnalysisJob, resume: &Path) -> Result<String, PipelineError> {
        self.progress
            .record(
                job.id,
                Step::ExtractText,
                "Extracting text from resume using OCR",
                None,
            )
            .await;

        let text = self.extractor.extract(job.id, resume).await?;

        self.progress
            .record(
                job.id,
                Step::ExtractText,
                "Text extracted successfully",
                Some(json!({ "text_length": text.len() })),
            )
            .await;
        Ok(text)
    }

    async fn generate_report(
        &self,
        job: &AnalysisJob,
        resume_text: &str,
        job_description: &str,
    ) -> Result<AnalysisReport, PipelineError> {
        self.progress
            .record(job.id, Step::GenerateReport, "Generating analysis report", None)
            .await;

        let report = self
            .generator
            .generate(job.id, resume_text, job_description)
            .await?;

        self.progress
            .record(
                job.id,
                Step::GenerateReport,
                "Report generated successfully",
                Some(json!({ "overall_score": report.overall_score })),
            )
            .await;
        Ok(report)
    }

    async fn ensure_candidate_record(
        &self,
        job: &AnalysisJob,
        report: &AnalysisReport,
    ) -> Result<(), PipelineError> {
        self.progress
            .record(
                job.id,
                Step::EnsureCandidateRecord,
                format!("Checking hr_candidates for id: {}", job.candidate_id),
                None,
            )
            .await;

        if self.repository.candidate_exists(job.candidate_id).await? {
            self.progress
                .record(
                    job.id,
                    Step::EnsureCandidateRecord,
                    "Candidate record already exists",
                    None,
                )
                .await;
            return Ok(());
        }

        let candidate = NewCandidate::from_details(job.candidate_id, &report.candidate_details);
        self.repository.insert_candidate(&candidate).await?;

        self.progress
            .record(
                job.id,
                Step::CreateCandidate,
                format!("Created new candidate record for {}", job.candidate_id),
                Some(json!({ "name": candidate.name, "email": candidate.email })),
            )
            .await;
        Ok(())
    }

    async fn save_report_pdf(
        &self,
        job: &AnalysisJob,
        report: &AnalysisReport,
        scratch: &mut ScratchFiles,
    ) -> Result<PathBuf, PipelineError> {
        self.progress
            .record(job.id, Step::SaveReportPdf, "Saving report as PDF", None)
            .await;

        let bytes = self.renderer.render(report).await?;
        let path = scratch.register(self.scratch_dir.join(report_file_name(job)));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| PipelineError::Render(format!("failed to write {}: {e}", path.display())))?;

        self.progress
            .record(
                job.id,
                Step::SaveReportPdf,
                "Report saved successfully",
                Some(json!({ "report_size": bytes.len() })),
            )
            .await;
        Ok(path)
    }

    async fn upload_report(&self, job: &AnalysisJob, report_path: &Path) -> Result<(), PipelineError> {
        let destination = self.report_destination(job);
        self.progress
            .record(
                job.id,
                Step::UploadReport,
                "Uploading report to storage",
                Some(json!({ "destination": destination })),
            )
            .await;

        self.uploader
            .upload(job.id, report_path, &destination)
            .await?;

        self.progress
            .record(
                job.id,
                Step::UploadReport,
                "Report uploaded successfully",
                Some(json!({ "destination": destination })),
            )
            .await;
        Ok(())
    }

    async fn update_job_candidate_status(
        &self,
        job: &AnalysisJob,
        report: &AnalysisReport,
    ) -> Result<(), PipelineError> {
        self.progress
            .record(
                job.id,
                Step::UpdateJobCandidateStatus,
                format!("Updating hr_job_candidates for id: {}", job.candidate_id),
                None,
            )
            .await;

        // The join row is keyed by the candidate id.
        if !self.repository.join_record_exists(job.candidate_id).await? {
            return Err(PipelineError::JoinRecordMissing(job.candidate_id));
        }

        let update = JobCandidateUpdate::finished(job.id, job.candidate_id, report);
        self.repository
            .complete_join_record(job.candidate_id, &update)
            .await?;

        self.progress
            .record(
                job.id,
                Step::UpdateJobCandidateStatus,
                format!("Updated hr_job_candidates record for id: {}", job.candidate_id),
                Some(json!({ "status": update.status, "overall_score": update.overall_score })),
            )
            .await;
        Ok(())
    }

    // ── failure handling ────────────────────────────────────────────────────

    /// Best effort; a failure here is only logged.
    async fn mark_failed(&self, job: &AnalysisJob) {
        match self
            .repository
            .mark_join_record_failed(job.id, job.candidate_id)
            .await
        {
            Ok(true) => info!(job_id = %job.id, candidate_id = %job.candidate_id, "Marked job candidate as failed"),
            Ok(false) => warn!(
                job_id = %job.id,
                candidate_id = %job.candidate_id,
                "No hr_job_candidates row to mark as failed"
            ),
            Err(e) => error!(
                job_id = %job.id,
                candidate_id = %job.candidate_id,
                "Failed to mark job candidate as failed: {e}"
            ),
        }
    }

    fn report_destination(&self, job: &AnalysisJob) -> String {
        let file = report_file_name(job);
        if self.report_path_prefix.is_empty() {
            format!("{}/{file}", job.id)
        } else {
            format!("{}/{}/{file}", self.report_path_prefix, job.id)
        }
    }
}

fn report_file_name(job: &AnalysisJob) -> String {
    format!("report_{}_{}.pdf", job.id, job.candidate_id)
}
