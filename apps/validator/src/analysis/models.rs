use serde::{Deserialize, Serialize};

/// Default for candidate fields the model did not report.
pub const NOT_PROVIDED: &str = "Not provided";
/// Default for section text fields the model did not report.
pub const NOT_FOUND: &str = "Not found";

/// The four scored evaluation categories, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectionKind {
    SkillMatch,
    WorkExperience,
    RelevantProjects,
    Education,
}

impl SectionKind {
    pub const ALL: [SectionKind; 4] = [
        SectionKind::SkillMatch,
        SectionKind::WorkExperience,
        SectionKind::RelevantProjects,
        SectionKind::Education,
    ];

    /// Human-readable category name, also the header text without the colon.
    pub fn title(&self) -> &'static str {
        match self {
            SectionKind::SkillMatch => "Skill Match",
            SectionKind::WorkExperience => "Work Experience",
            SectionKind::RelevantProjects => "Relevant Projects",
            SectionKind::Education => "Education",
        }
    }

    /// Weight of this category in the overall score.
    pub fn weight(&self) -> f64 {
        match self {
            SectionKind::SkillMatch => 0.3,
            SectionKind::WorkExperience => 0.2,
            SectionKind::RelevantProjects => 0.3,
            SectionKind::Education => 0.2,
        }
    }
}

/// Evaluation of one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionScore {
    pub matches: String,
    pub non_matches: String,
    pub summary: String,
    /// 0 – 100
    pub score: u8,
    pub enhancement_tips: String,
}

impl Default for SectionScore {
    fn default() -> Self {
        Self {
            matches: NOT_FOUND.to_string(),
            non_matches: NOT_FOUND.to_string(),
            summary: NOT_FOUND.to_string(),
            score: 0,
            enhancement_tips: NOT_FOUND.to_string(),
        }
    }
}

/// Contact details extracted from the résumé.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateDetails {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub linkedin: String,
    pub github: String,
}

impl Default for CandidateDetails {
    fn default() -> Self {
        Self {
            name: NOT_PROVIDED.to_string(),
            phone: NOT_PROVIDED.to_string(),
            email: NOT_PROVIDED.to_string(),
            linkedin: NOT_PROVIDED.to_string(),
            github: NOT_PROVIDED.to_string(),
        }
    }
}

/// Field labels used by the analysis template, in template order.
pub const CANDIDATE_LABELS: [&str; 5] = ["Name", "Phone Number", "Email", "LinkedIn", "GitHub"];

impl CandidateDetails {
    /// Template labels paired with their values, in template order.
    pub fn labeled(&self) -> [(&'static str, &str); 5] {
        [
            (CANDIDATE_LABELS[0], &self.name),
            (CANDIDATE_LABELS[1], &self.phone),
            (CANDIDATE_LABELS[2], &self.email),
            (CANDIDATE_LABELS[3], &self.linkedin),
            (CANDIDATE_LABELS[4], &self.github),
        ]
    }

    pub(crate) fn field_mut(&mut self, label: &str) -> Option<&mut String> {
        match label {
            "Name" => Some(&mut self.name),
            "Phone Number" => Some(&mut self.phone),
            "Email" => Some(&mut self.email),
            "LinkedIn" => Some(&mut self.linkedin),
            "GitHub" => Some(&mut self.github),
            _ => None,
        }
    }
}

/// Returns the value unless it is empty or the "Not provided" sentinel.
pub fn provided(value: &str) -> Option<&str> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case(NOT_PROVIDED) {
        None
    } else {
        Some(value)
    }
}

/// One `SectionScore` per category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sections {
    #[serde(rename = "Skill Match")]
    pub skill_match: SectionScore,
    #[serde(rename = "Work Experience")]
    pub work_experience: SectionScore,
    #[serde(rename = "Relevant Projects")]
    pub relevant_projects: SectionScore,
    #[serde(rename = "Education")]
    pub education: SectionScore,
}

impl Sections {
    pub fn get(&self, kind: SectionKind) -> &SectionScore {
        match kind {
            SectionKind::SkillMatch => &self.skill_match,
            SectionKind::WorkExperience => &self.work_experience,
            SectionKind::RelevantProjects => &self.relevant_projects,
            SectionKind::Education => &self.education,
        }
    }

    pub fn get_mut(&mut self, kind: SectionKind) -> &mut SectionScore {
        match kind {
            SectionKind::SkillMatch => &mut self.skill_match,
            SectionKind::WorkExperience => &mut self.work_experience,
            SectionKind::RelevantProjects => &mut self.relevant_projects,
            SectionKind::Education => &mut self.education,
        }
    }
}

/// Structured result of one résumé evaluation.
///
/// Constructed with defaults, then overwritten field by field by the parser;
/// anything the model did not report keeps its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub candidate_details: CandidateDetails,
    pub sections: Sections,
    pub overall_summary: String,
    /// 0.0 – 100.0, one decimal place.
    pub overall_score: f64,
}

impl Default for AnalysisReport {
    fn default() -> Self {
        Self {
            candidate_details: CandidateDetails::default(),
            sections: Sections::default(),
            overall_summary: NOT_FOUND.to_string(),
            overall_score: 0.0,
        }
    }
}

impl AnalysisReport {
    /// Weighted overall score recomputed from the section scores, one decimal place.
    ///
    /// Skills 30%, Work Experience 20%, Relevant Projects 30%, Education 20%.
    pub fn weighted_overall_score(&self) -> f64 {
        let total: f64 = SectionKind::ALL
            .iter()
            .map(|kind| f64::from(self.sections.get(*kind).score) * kind.weight())
            .sum();
        round_one_decimal(total)
    }
}

pub(crate) fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
