//! Rows written to the HR schema (`hr_candidates`, `hr_job_candidates`).
//! The schema itself is owned elsewhere; this service only reads and updates it.

use serde::Serialize;
use uuid::Uuid;

use crate::analysis::models::{provided, SectionScore};
use crate::analysis::{AnalysisReport, CandidateDetails};

/// Name stored when the résumé did not yield one.
pub const UNKNOWN_CANDIDATE_NAME: &str = "Unknown";

/// Placeholder address for candidates whose résumé has no email; `email` is NOT NULL.
pub fn placeholder_email(candidate_id: Uuid) -> String {
    format!("unknown_{candidate_id}@example.com")
}

/// New `hr_candidates` row built from extracted contact details.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewCandidate {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub linkedin_url: Option<String>,
    pub github_url: Option<String>,
}

impl NewCandidate {
    /// "Not provided" and blank values become placeholders (name, email) or NULL.
    pub fn from_details(candidate_id: Uuid, details: &CandidateDetails) -> Self {
        Self {
            id: candidate_id,
            name: provided(&details.name)
                .unwrap_or(UNKNOWN_CANDIDATE_NAME)
                .to_string(),
            email: provided(&details.email)
                .map(str::to_string)
                .unwrap_or_else(|| placeholder_email(candidate_id)),
            phone_number: provided(&details.phone).map(str::to_string),
            linkedin_url: provided(&details.linkedin).map(str::to_string),
            github_url: provided(&details.github).map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobCandidateStatus {
    Finished,
    Failed,
}

impl JobCandidateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobCandidateStatus::Finished => "finished",
            JobCandidateStatus::Failed => "failed",
        }
    }
}

/// `<prefix>_score`, `<prefix>_summary`, `<prefix>_enhancement_tips` for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionColumns {
    pub score: i32,
    pub summary: String,
    pub enhancement_tips: String,
}

impl From<&SectionScore> for SectionColumns {
    fn from(section: &SectionScore) -> Self {
        Self {
            score: i32::from(section.score),
            summary: section.summary.clone(),
            enhancement_tips: section.enhancement_tips.clone(),
        }
    }
}

/// Values written to an `hr_job_candidates` row when a run finishes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobCandidateUpdate {
    pub job_id: Uuid,
    pub candidate_id: Uuid,
    pub status: JobCandidateStatus,
    pub overall_score: f64,
    pub overall_summary: String,
    pub skills: SectionColumns,
    pub work_experience: SectionColumns,
    pub projects: SectionColumns,
    pub education: SectionColumns,
}

impl JobCandidateUpdate {
    pub fn finished(job_id: Uuid, candidate_id: Uuid, report: &AnalysisReport) -> Self {
        let sections = &report.sections;
        Self {
            job_id,
            candidate_id,
            status: JobCandidateStatus::Finished,
            overall_score: report.overall_score,
            overall_summary: report.overall_summary.clone(),
            skills: (&sections.skill_match).into(),
            work_experience: (&sections.work_experience).into(),
            projects: (&sections.relevant_projects).into(),
            education: (&sections.education).into(),
        }
    }
}
