//! Résumé text extraction: every page is rasterized and OCR'd, so scanned and
//! text-layer PDFs go through the same path.

pub mod ocr;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use crate::errors::PipelineError;
use crate::progress::{preview, ProgressLog, Step};

pub use ocr::{ExtractError, OcrEngine, PageRasterizer, PopplerRasterizer, TesseractOcr};

/// Resolution pages are rendered at before OCR.
pub const RASTER_DPI: u32 = 200;

/// Returned when OCR found nothing on any page.
pub const NO_TEXT_EXTRACTED: &str = "No text extracted";

const PAGE_PREVIEW_CHARS: usize = 500;
const TEXT_PREVIEW_CHARS: usize = 1000;

pub struct TextExtractor {
    rasterizer: Arc<dyn PageRasterizer>,
    ocr: Arc<dyn OcrEngine>,
    progress: ProgressLog,
    /// Parent of the per-run page image directory.
    scratch_dir: PathBuf,
}

impl TextExtractor {
    pub fn new(
        rasterizer: Arc<dyn PageRasterizer>,
        ocr: Arc<dyn OcrEngine>,
        progress: ProgressLog,
        scratch_dir: PathBuf,
    ) -> Self {
        Self {
            rasterizer,
            ocr,
            progress,
            scratch_dir,
        }
    }

    /// Extracts the text of every page of `pdf`, in page order.
    ///
    /// Pages that fail to rasterize are skipped. OCR and I/O failures abort the
    /// extraction with `PipelineError::Extraction`.
    pub async fn extract(&self, job_id: Uuid, pdf: &Path) -> Result<String, PipelineError> {
        let page_count = self
            .rasterizer
            .page_count(pdf)
            .await
            .map_err(|e| PipelineError::PageCount(e.to_string()))?;

        self.progress
            .record(
                job_id,
                Step::ExtractText,
                format!("PDF has {page_count} pages"),
                Some(json!({ "page_count": page_count })),
            )
            .await;

        // Removed on drop, together with any image left behind.
        let image_dir = tempfile::Builder::new()
            .prefix(&format!("{job_id}-pages-"))
            .tempdir_in(&self.scratch_dir)
            .map_err(|e| PipelineError::Extraction(format!("failed to create image dir: {e}")))?;

        let mut text = String::new();

        for page in 1..=page_count {
            self.progress
                .record(
                    job_id,
                    Step::ExtractText,
                    format!("Converting page {page}/{page_count} to image at {RASTER_DPI} DPI"),
                    None,
                )
                .await;

            let image = match self
                .rasterizer
                .rasterize(pdf, page, RASTER_DPI, image_dir.path())
                .await
            {
                Ok(Some(image)) => image,
                Ok(None) => {
                    self.progress
                        .record(
                            job_id,
                            Step::ExtractText,
                            format!("No image produced for page {page}, skipping"),
                            Some(json!({ "page": page })),
                        )
                        .await;
                    continue;
                }
                Err(e) => {
                    self.progress
                        .record(
                            job_id,
                            Step::ExtractText,
                            format!("Failed to convert page {page} to image, skipping"),
                            Some(json!({ "page": page, "error": e.to_string() })),
                        )
                        .await;
                    continue;
                }
            };

            let page_text = self
                .ocr
                .recognize(&image)
                .await
                .map_err(|e| PipelineError::Extraction(format!("OCR failed on page {page}: {e}")))?;

            text.push_str(&format!("\n--- Page {page} ---\n"));
            text.push_str(&page_text);

            tokio::fs::remove_file(&image).await.map_err(|e| {
                PipelineError::Extraction(format!("failed to remove page {page} image: {e}"))
            })?;

            self.progress
                .record(
                    job_id,
                    Step::ExtractText,
                    format!("Extracted text from page {page}"),
                    Some(json!({
                        "page": page,
                        "page_text_length": page_text.len(),
                        "page_text_preview": preview(&page_text, PAGE_PREVIEW_CHARS),
                    })),
                )
                .await;
        }

        self.progress
            .record(
                job_id,
                Step::ExtractText,
                "Text extraction complete",
                Some(json!({
                    "text_length": text.len(),
                    "text_preview": preview(&text, TEXT_PREVIEW_CHARS),
                })),
            )
            .await;

        let text = text.trim();
        if text.is_empty() {
            Ok(NO_TEXT_EXTRACTED.to_string())
        } else {
            Ok(text.to_string())
        }
    }
}
