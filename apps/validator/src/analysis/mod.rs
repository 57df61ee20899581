// Résumé analysis: prompt construction, LLM call and parsing of the
// plain-text report into `AnalysisReport`.
// All LLM calls go through llm_client::TextCompletion.

pub mod generator;
pub mod models;
pub mod parser;
pub mod prompts;

pub use generator::ReportGenerator;
pub use models::{AnalysisReport, CandidateDetails, SectionKind};
