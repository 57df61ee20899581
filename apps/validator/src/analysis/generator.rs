//! Report generation: prompt → LLM → clean → parse, retried as a whole.
//!
//! Each attempt leaves debug entries in the job's progress log so a failed or
//! surprising analysis can be inspected through the job-logs endpoint.

use std::sync::Arc;

use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::analysis::models::AnalysisReport;
use crate::analysis::parser::{clean_llm_output, parse_report};
use crate::analysis::prompts::ANALYSIS_PROMPT_TEMPLATE;
use crate::errors::PipelineError;
use crate::llm_client::prompts::EVIDENCE_INSTRUCTION;
use crate::llm_client::{LlmError, TextCompletion};
use crate::progress::{preview, ProgressLog, Step};
use crate::retry::{retry_with_backoff, RetryPolicy};

const PREVIEW_CHARS: usize = 1000;

/// The overall score the model reports is kept as-is; a larger drift from the
/// weighted section scores than this is only logged.
const SCORE_DRIFT_WARNING: f64 = 1.0;

pub struct ReportGenerator {
    llm: Arc<dyn TextCompletion>,
    progress: ProgressLog,
    retry: RetryPolicy,
}

impl ReportGenerator {
    pub fn new(llm: Arc<dyn TextCompletion>, progress: ProgressLog) -> Self {
        Self {
            llm,
            progress,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Produces a structured report for the résumé text against the job description.
    ///
    /// Returns `PipelineError::Generation` once every attempt has failed; a partial
    /// report is never returned.
    pub async fn generate(
        &self,
        job_id: Uuid,
        resume_text: &str,
        job_description: &str,
    ) -> Result<AnalysisReport, PipelineError> {
        let prompt = build_prompt(resume_text, job_description);
        let prompt = prompt.as_str();

        retry_with_backoff(&self.retry, "generate_report", move |attempt| {
            self.attempt(job_id, attempt, prompt, resume_text, job_description)
        })
        .await
        .map_err(|e| PipelineError::Generation(e.to_string()))
    }

    async fn attempt(
        &self,
        job_id: Uuid,
        attempt: u32,
        prompt: &str,
        resume_text: &str,
        job_description: &str,
    ) -> Result<AnalysisReport, LlmError> {
        self.progress
            .record(
                job_id,
                Step::GenerateReportInput,
                format!("Sending analysis prompt (attempt {attempt})"),
                Some(json!({
                    "attempt": attempt,
                    "resume_text_preview": preview(resume_text, PREVIEW_CHARS),
                    "job_description_preview": preview(job_description, PREVIEW_CHARS),
                })),
            )
            .await;

        let raw = match self.llm.complete(prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                self.progress
                    .record(
                        job_id,
                        Step::GenerateReportError,
                        format!("Report generation attempt {attempt} failed"),
                        Some(json!({ "attempt": attempt, "error": e.to_string() })),
                    )
                    .await;
                return Err(e);
            }
        };

        let cleaned = clean_llm_output(&raw);
        self.progress
            .record(
                job_id,
                Step::GenerateReportOutput,
                "Received analysis from LLM",
                Some(json!({
                    "output_length": cleaned.len(),
                    "output_preview": preview(&cleaned, PREVIEW_CHARS),
                })),
            )
            .await;

        if cleaned.is_empty() {
            self.progress
                .record(
                    job_id,
                    Step::GenerateReportError,
                    format!("Report generation attempt {attempt} returned only headings"),
                    Some(json!({ "attempt": attempt })),
                )
                .await;
            return Err(LlmError::EmptyContent);
        }

        let report = parse_report(&cleaned);
        let weighted = report.weighted_overall_score();
        if (weighted - report.overall_score).abs() > SCORE_DRIFT_WARNING {
            warn!(
                job_id = %job_id,
                reported = report.overall_score,
                weighted,
                "Overall score differs from the weighted section scores"
            );
        }

        self.progress
            .record(
                job_id,
                Step::GenerateReportParsed,
                "Parsed analysis report",
                Some(json!({
                    "report": serde_json::to_value(&report).unwrap_or_default(),
                    "weighted_overall_score": weighted,
                })),
            )
            .await;

        Ok(report)
    }
}

fn build_prompt(resume_text: &str, job_description: &str) -> String {
    ANALYSIS_PROMPT_TEMPLATE
        .replace("{evidence_instruction}", EVIDENCE_INSTRUCTION)
        .replace("{resume_text}", resume_text)
        .replace("{job_description}", job_description)
}
