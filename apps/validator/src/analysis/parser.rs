//! Line-oriented parser for the analysis template.
//!
//! The model is asked for a fixed plain-text template (see `analysis::prompts`).
//! Parsing is a small state machine: exact header lines switch the current block,
//! labeled lines fill fields, and anything unlabeled inside a scored section is
//! treated as a continuation of the last labeled field. That last rule is a
//! heuristic; a model that wraps text differently can misattribute lines.

use crate::analysis::models::{round_one_decimal, AnalysisReport, SectionKind, CANDIDATE_LABELS};

const CANDIDATE_DETAILS_HEADER: &str = "Candidate Details:";
const OVERALL_SUMMARY_HEADER: &str = "Overall Summary:";
const OVERALL_SCORE_MARKER: &str = "Overall Score:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    None,
    CandidateDetails,
    Section(SectionKind),
    OverallSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextField {
    NonMatches,
    Matches,
    EnhancementTips,
    Summary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionLabel {
    Text(TextField),
    Score,
}

/// A line belongs to the label that starts earliest in it, so "Non-Matches:"
/// wins over the "Matches:" it contains and a leading "Score:" wins over any
/// label quoted in its rationale.
const SECTION_LABELS: [(&str, SectionLabel); 5] = [
    ("Non-Matches:", SectionLabel::Text(TextField::NonMatches)),
    ("Matches:", SectionLabel::Text(TextField::Matches)),
    ("Enhancement Tips:", SectionLabel::Text(TextField::EnhancementTips)),
    ("Summary:", SectionLabel::Text(TextField::Summary)),
    ("Score:", SectionLabel::Score),
];

#[derive(Debug, Default)]
struct SectionAccumulator {
    matches: Vec<String>,
    non_matches: Vec<String>,
    summary: Vec<String>,
    enhancement_tips: Vec<String>,
    last_touched: Option<TextField>,
}

impl SectionAccumulator {
    fn field_mut(&mut self, field: TextField) -> &mut Vec<String> {
        match field {
            TextField::NonMatches => &mut self.non_matches,
            TextField::Matches => &mut self.matches,
            TextField::EnhancementTips => &mut self.enhancement_tips,
            TextField::Summary => &mut self.summary,
        }
    }

    fn push(&mut self, field: TextField, text: &str) {
        if !text.is_empty() {
            self.field_mut(field).push(text.to_string());
        }
        self.last_touched = Some(field);
    }
}

/// Removes heading lines (`## ...`) the model emits despite instructions.
pub fn clean_llm_output(raw: &str) -> String {
    raw.lines()
        .filter(|line| !line.trim_start().starts_with("##"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Parses cleaned model output into a report. Never fails: fields that cannot be
/// found keep their defaults.
pub fn parse_report(text: &str) -> AnalysisReport {
    let mut report = AnalysisReport::default();
    let mut state = ParseState::None;
    let mut section = SectionAccumulator::default();
    let mut overall_summary: Vec<String> = Vec::new();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(next) = header_state(line) {
            state = next;
            match next {
                ParseState::Section(_) => section = SectionAccumulator::default(),
                ParseState::OverallSummary => overall_summary.clear(),
                _ => {}
            }
            continue;
        }

        if let Some((_, rest)) = line.split_once(OVERALL_SCORE_MARKER) {
            report.overall_score = parse_overall_score(rest);
            continue;
        }

        match state {
            ParseState::None => {}
            ParseState::CandidateDetails => {
                let labeled = CANDIDATE_LABELS.iter().find_map(|label| {
                    line.split_once(format!("- {label}:").as_str())
                        .map(|(_, value)| (*label, value.trim()))
                });
                if let Some((label, value)) = labeled {
                    if let (false, Some(field)) =
                        (value.is_empty(), report.candidate_details.field_mut(label))
                    {
                        *field = value.to_string();
                    }
                }
            }
            ParseState::Section(kind) => {
                parse_section_line(line, &mut section, &mut report, kind);
                flush_section(&section, &mut report, kind);
            }
            ParseState::OverallSummary => {
                let text = strip_bullet(line).replace(OVERALL_SUMMARY_HEADER, "");
                let text = text.trim();
                if !text.is_empty() {
                    overall_summary.push(text.to_string());
                }
                if !overall_summary.is_empty() {
                    report.overall_summary = overall_summary.join(" ");
                }
            }
        }
    }

    report
}

fn header_state(line: &str) -> Option<ParseState> {
    if line == CANDIDATE_DETAILS_HEADER {
        return Some(ParseState::CandidateDetails);
    }
    if line == OVERALL_SUMMARY_HEADER {
        return Some(ParseState::OverallSummary);
    }
    SectionKind::ALL
        .into_iter()
        .find(|kind| line.strip_suffix(':') == Some(kind.title()))
        .map(ParseState::Section)
}

fn parse_section_line(
    line: &str,
    section: &mut SectionAccumulator,
    report: &mut AnalysisReport,
    kind: SectionKind,
) {
    match earliest_label(line) {
        Some((SectionLabel::Text(field), rest)) => section.push(field, rest.trim()),
        Some((SectionLabel::Score, rest)) => {
            report.sections.get_mut(kind).score = parse_section_score(rest);
        }
        None => continuation(line, section),
    }
}

fn earliest_label(line: &str) -> Option<(SectionLabel, &str)> {
    SECTION_LABELS
        .iter()
        .filter_map(|(label, kind)| {
            line.find(label)
                .map(|pos| (pos, *kind, &line[pos + label.len()..]))
        })
        .min_by_key(|(pos, _, _)| *pos)
        .map(|(_, kind, rest)| (kind, rest))
}

/// An unlabeled line extends the previous labeled field.
fn continuation(line: &str, section: &mut SectionAccumulator) {
    if let Some(field) = section.last_touched {
        section.push(field, strip_bullet(line));
    }
}

fn flush_section(section: &SectionAccumulator, report: &mut AnalysisReport, kind: SectionKind) {
    let target = report.sections.get_mut(kind);
    let pairs = [
        (&section.matches, &mut target.matches),
        (&section.non_matches, &mut target.non_matches),
        (&section.summary, &mut target.summary),
        (&section.enhancement_tips, &mut target.enhancement_tips),
    ];
    for (parts, field) in pairs {
        if !parts.is_empty() {
            *field = parts.join(" ");
        }
    }
}

fn strip_bullet(line: &str) -> &str {
    line.strip_prefix("- ").unwrap_or(line).trim()
}

/// `"75/100 - rationale"` → 75. Missing digits → 0; anything above 100 → 100.
fn parse_section_score(rest: &str) -> u8 {
    let before_slash = rest.split('/').next().unwrap_or("").trim();
    let digits: String = before_slash
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return 0;
    }
    digits.parse::<u32>().map(|n| n.min(100)).unwrap_or(100) as u8
}

/// `" 78.46/100"` → 78.5. Non-numeric → 0.0; clamped to [0, 100].
fn parse_overall_score(rest: &str) -> f64 {
    let before_slash = rest.split('/').next().unwrap_or("").trim();
    match before_slash.parse::<f64>() {
        Ok(value) if value.is_finite() => round_one_decimal(value.clamp(0.0, 100.0)),
        _ => 0.0,
    }
}
