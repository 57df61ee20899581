//! Page rasterization and OCR backends.
//!
//! Production backends shell out to poppler's `pdftoppm` and the `tesseract` CLI
//! (`apt install poppler-utils tesseract-ocr`); page counting uses lopdf.

use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Failed to run {tool}: {source}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}: {stderr}")]
    Tool {
        tool: &'static str,
        status: String,
        stderr: String,
    },

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait PageRasterizer: Send + Sync {
    async fn page_count(&self, pdf: &Path) -> Result<usize, ExtractError>;

    /// Renders page `page` (1-based) to an image inside `out_dir`.
    /// `Ok(None)` means the tool ran but produced no image.
    async fn rasterize(
        &self,
        pdf: &Path,
        page: usize,
        dpi: u32,
        out_dir: &Path,
    ) -> Result<Option<PathBuf>, ExtractError>;
}

#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image: &Path) -> Result<String, ExtractError>;
}

// ────────────────────────────────────────────────────────────────────────────
// poppler
// ────────────────────────────────────────────────────────────────────────────

pub struct PopplerRasterizer;

#[async_trait]
impl PageRasterizer for PopplerRasterizer {
    async fn page_count(&self, pdf: &Path) -> Result<usize, ExtractError> {
        let pdf = pdf.to_path_buf();
        tokio::task::spawn_blocking(move || {
            lopdf::Document::load(&pdf)
                .map(|doc| doc.get_pages().len())
                .map_err(|e| ExtractError::Pdf(e.to_string()))
        })
        .await
        .map_err(|e| ExtractError::Pdf(format!("page count task failed: {e}")))?
    }

    async fn rasterize(
        &self,
        pdf: &Path,
        page: usize,
        dpi: u32,
        out_dir: &Path,
    ) -> Result<Option<PathBuf>, ExtractError> {
        let prefix = out_dir.join(format!("page-{page}"));
        let page_arg = page.to_string();

        let output = Command::new("pdftoppm")
            .arg("-png")
            .args(["-r", &dpi.to_string()])
            .args(["-f", &page_arg, "-l", &page_arg])
            .arg("-singlefile")
            .arg(pdf)
            .arg(&prefix)
            .output()
            .await
            .map_err(|source| ExtractError::Spawn {
                tool: "pdftoppm",
                source,
            })?;
        check_status("pdftoppm", &output)?;

        // -singlefile writes exactly `<prefix>.png`
        let image = prefix.with_extension("png");
        if tokio::fs::try_exists(&image).await? {
            Ok(Some(image))
        } else {
            Ok(None)
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// tesseract
// ────────────────────────────────────────────────────────────────────────────

/// Tesseract with LSTM engine (`--oem 3`) and single uniform block segmentation (`--psm 6`).
pub struct TesseractOcr;

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize(&self, image: &Path) -> Result<String, ExtractError> {
        let output = Command::new("tesseract")
            .arg(image)
            .arg("stdout")
            .args(["--oem", "3", "--psm", "6"])
            .output()
            .await
            .map_err(|source| ExtractError::Spawn {
                tool: "tesseract",
                source,
            })?;
        check_status("tesseract", &output)?;

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("tesseract read {} characters from {}", text.len(), image.display());
        Ok(text)
    }
}

fn check_status(tool: &'static str, output: &Output) -> Result<(), ExtractError> {
    if output.status.success() {
        return Ok(());
    }
    Err(ExtractError::Tool {
        tool,
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}
