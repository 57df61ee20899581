//! Report rendering: `AnalysisReport` → positioned lines → PDF bytes.
//!
//! `layout_report` is pure and does all the measuring and pagination; `write_pdf`
//! only turns positioned lines into content streams. Coordinates are PDF points
//! with the origin at the bottom-left corner.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};
use thiserror::Error;

use crate::analysis::{AnalysisReport, SectionKind};
use crate::errors::PipelineError;
use crate::layout::font_metrics::{measure, Font};

/// US Letter.
pub const PAGE_WIDTH: f64 = 612.0;
pub const PAGE_HEIGHT: f64 = 792.0;
pub const MARGIN: f64 = 72.0;
pub const FONT_SIZE: f64 = 12.0;
pub const LINE_HEIGHT: f64 = 15.0;
pub const SECTION_GAP: f64 = 20.0;
pub const INDENT: f64 = 10.0;
pub const TEXT_WIDTH: f64 = PAGE_WIDTH - 2.0 * MARGIN;

const TOP: f64 = PAGE_HEIGHT - MARGIN;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("PDF encoding failed: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("PDF write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// One line of text at its final position.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub x: f64,
    /// Baseline.
    pub y: f64,
    pub font: Font,
    pub text: String,
}

pub type Page = Vec<PlacedLine>;

// ────────────────────────────────────────────────────────────────────────────
// Layout
// ────────────────────────────────────────────────────────────────────────────

struct Cursor {
    pages: Vec<Page>,
    y: f64,
}

impl Cursor {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            y: TOP,
        }
    }

    fn new_page(&mut self) {
        self.pages.push(Vec::new());
        self.y = TOP;
    }

    fn place(&mut self, text: &str, font: Font, indent: f64) {
        if text.is_empty() {
            return;
        }
        let line = PlacedLine {
            x: MARGIN + indent,
            y: self.y,
            font,
            text: text.to_string(),
        };
        if let Some(page) = self.pages.last_mut() {
            page.push(line);
        }
    }

    /// Greedy word wrap at the text width minus `indent`.
    fn add_text(&mut self, text: &str, bold: bool, indent: f64) {
        let font = Font::for_weight(bold);
        if self.y < MARGIN {
            self.new_page();
        }

        let max_width = TEXT_WIDTH - indent;
        let mut line = String::new();

        for word in text.split_whitespace() {
            if line.is_empty() {
                // A word wider than the line still gets a line of its own.
                line.push_str(word);
                continue;
            }
            let candidate = format!("{line} {word}");
            if measure(&candidate, font, FONT_SIZE) <= max_width {
                line = candidate;
            } else {
                self.place(&line, font, indent);
                self.y -= LINE_HEIGHT;
                if self.y < MARGIN {
                    self.new_page();
                }
                line = word.to_string();
            }
        }

        self.place(&line, font, indent);
        self.y -= LINE_HEIGHT;
    }

    fn gap(&mut self) {
        self.y -= SECTION_GAP;
    }
}

/// Lays out the full report. Enhancement tips are deliberately not printed.
pub fn layout_report(report: &AnalysisReport) -> Vec<Page> {
    let mut cursor = Cursor::new();

    cursor.add_text("Resume Analysis Report", true, 0.0);
    cursor.gap();

    cursor.add_text("Candidate Details", true, 0.0);
    for (label, value) in report.candidate_details.labeled() {
        cursor.add_text(&format!("- {label}: {value}"), false, INDENT);
    }
    cursor.gap();

    for kind in SectionKind::ALL {
        let section = report.sections.get(kind);
        cursor.add_text(kind.title(), true, 0.0);
        cursor.add_text(&format!("Score: {}/100", section.score), false, INDENT);
        cursor.add_text(&format!("Matches: {}", section.matches), false, INDENT);
        cursor.add_text(&format!("Non-Matches: {}", section.non_matches), false, INDENT);
        cursor.add_text(&format!("Summary: {}", section.summary), false, INDENT);
        cursor.gap();
    }

    cursor.add_text("Overall Summary", true, 0.0);
    cursor.add_text(&report.overall_summary, false, INDENT);
    cursor.add_text(
        &format!("Overall Score: {:.1}/100", report.overall_score),
        false,
        INDENT,
    );

    cursor.pages
}

// ────────────────────────────────────────────────────────────────────────────
// PDF output
// ────────────────────────────────────────────────────────────────────────────

/// Writes laid-out pages as a PDF 1.5 document using the standard Helvetica fonts.
pub fn write_pdf(pages: &[Page]) -> Result<Vec<u8>, RenderError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(font_dictionary(Font::Helvetica));
    let bold_id = doc.add_object(font_dictionary(Font::HelveticaBold));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            Font::Helvetica.resource_name() => regular_id,
            Font::HelveticaBold.resource_name() => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in pages {
        let mut operations = Vec::with_capacity(page.len() * 5);
        for line in page {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new(
                "Tf",
                vec![line.font.resource_name().into(), (FONT_SIZE as f32).into()],
            ));
            operations.push(Operation::new(
                "Td",
                vec![(line.x as f32).into(), (line.y as f32).into()],
            ));
            operations.push(Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(&line.text), StringFormat::Literal)],
            ));
            operations.push(Operation::new("ET", vec![]));
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}

fn font_dictionary(font: Font) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => font.base_font(),
        "Encoding" => "WinAnsiEncoding",
    }
}

/// Lossy WinAnsi encoding: Latin-1 passes through, common typographic
/// punctuation is mapped, control characters become spaces and anything else `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\t' | '\n' | '\r' => b' ',
            ' '..='~' => c as u8,
            '\u{A0}'..='\u{FF}' => c as u32 as u8,
            '€' => 0x80,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '™' => 0x99,
            _ => b'?',
        })
        .collect()
}

pub fn render_pdf(report: &AnalysisReport) -> Result<Vec<u8>, RenderError> {
    write_pdf(&layout_report(report))
}

/// Renders reports off the async executor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportRenderer;

impl ReportRenderer {
    pub async fn render(&self, report: &AnalysisReport) -> Result<Vec<u8>, PipelineError> {
        let report = report.clone();
        tokio::task::spawn_blocking(move || render_pdf(&report))
            .await
            .map_err(|e| PipelineError::Render(format!("render task failed: {e}")))?
            .map_err(|e| PipelineError::Render(e.to_string()))
    }
}
