/*!
 * OCR fallback for scanned documents.
 *
 * Pages are rendered to PNG with poppler's `pdftoppm` and recognized with the
 * `tesseract` command line tool. Both steps sit behind traits so tests can
 * substitute them.
 */

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

use crate::app_config::AcquisitionConfig;
use crate::document::Document;

use super::normalize::join_pages;
use super::{AcquisitionMethod, AcquisitionStrategy, ExtractedText};

/// Turns PDF pages into images
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Number of pages in the document
    async fn page_count(&self, document: &Document) -> Result<usize>;

    /// Render one page (1-based) of the PDF at `pdf_path` into `out_dir`,
    /// returning the image path
    async fn render_page(&self, pdf_path: &Path, page: usize, out_dir: &Path) -> Result<PathBuf>;
}

/// Recognizes text in a page image
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image: &Path, language: &str) -> Result<String>;
}

/// Run an external tool, failing if it exits non-zero or runs too long
async fn run_tool(program: &str, args: &[String], timeout: Duration) -> Result<Output> {
    let future = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output();

    let output = tokio::select! {
        result = future => {
            result.map_err(|e| anyhow!("Failed to execute {}: {}", program, e))?
        },
        _ = tokio::time::sleep(timeout) => {
            return Err(anyhow!("{} timed out after {} seconds", program, timeout.as_secs()));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("{} failed: {}", program, stderr.trim()));
    }

    Ok(output)
}

/// Page renderer backed by `pdftoppm`
#[derive(Debug, Clone)]
pub struct PdftoppmRenderer {
    binary: String,
    dpi: u32,
    timeout: Duration,
}

impl PdftoppmRenderer {
    pub fn new(binary: impl Into<String>, dpi: u32, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            dpi,
            timeout,
        }
    }

    pub fn from_config(config: &AcquisitionConfig) -> Self {
        Self::new(
            config.pdftoppm_path.clone(),
            config.ocr_dpi,
            Duration::from_secs(config.ocr_timeout_secs),
        )
    }
}

#[async_trait]
impl PageRenderer for PdftoppmRenderer {
    async fn page_count(&self, document: &Document) -> Result<usize> {
        let bytes = document.bytes.clone();
        tokio::task::spawn_blocking(move || {
            lopdf::Document::load_mem(&bytes)
                .map(|pdf| pdf.get_pages().len())
                .map_err(|e| anyhow!("Failed to open PDF for rendering: {}", e))
        })
        .await
        .context("Page count task aborted")?
    }

    async fn render_page(&self, pdf_path: &Path, page: usize, out_dir: &Path) -> Result<PathBuf> {
        let prefix = out_dir.join(format!("page-{}", page));
        let args = vec![
            "-f".to_string(),
            page.to_string(),
            "-l".to_string(),
            page.to_string(),
            "-r".to_string(),
            self.dpi.to_string(),
            "-png".to_string(),
            "-singlefile".to_string(),
            pdf_path.to_string_lossy().to_string(),
            prefix.to_string_lossy().to_string(),
        ];

        run_tool(&self.binary, &args, self.timeout).await?;

        let image = prefix.with_extension("png");
        if !image.is_file() {
            return Err(anyhow!("pdftoppm produced no image for page {}", page));
        }
        Ok(image)
    }
}

/// OCR engine backed by the `tesseract` command line tool
#[derive(Debug, Clone)]
pub struct TesseractCli {
    binary: String,
    timeout: Duration,
}

impl TesseractCli {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    pub fn from_config(config: &AcquisitionConfig) -> Self {
        Self::new(config.tesseract_path.clone(), Duration::from_secs(config.ocr_timeout_secs))
    }
}

#[async_trait]
impl OcrEngine for TesseractCli {
    async fn recognize(&self, image: &Path, language: &str) -> Result<String> {
        let args = vec![
            image.to_string_lossy().to_string(),
            "stdout".to_string(),
            "-l".to_string(),
            language.to_string(),
        ];

        let output = run_tool(&self.binary, &args, self.timeout).await?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Acquisition strategy that renders every page and recognizes it.
///
/// Pages are processed concurrently; the text keeps page order. A page that
/// fails contributes no text, the strategy only fails when every page does.
pub struct OcrStrategy {
    renderer: Arc<dyn PageRenderer>,
    engine: Arc<dyn OcrEngine>,
    language: String,
    concurrency: usize,
}

impl OcrStrategy {
    pub fn new(
        renderer: Arc<dyn PageRenderer>,
        engine: Arc<dyn OcrEngine>,
        language: impl Into<String>,
        concurrency: usize,
    ) -> Self {
        Self {
            renderer,
            engine,
            language: language.into(),
            concurrency: concurrency.max(1),
        }
    }

    /// pdftoppm + tesseract as configured
    pub fn from_config(config: &AcquisitionConfig) -> Self {
        Self::new(
            Arc::new(PdftoppmRenderer::from_config(config)),
            Arc::new(TesseractCli::from_config(config)),
            config.ocr_language.clone(),
            config.ocr_concurrency,
        )
    }
}

#[async_trait]
impl AcquisitionStrategy for OcrStrategy {
    fn method(&self) -> AcquisitionMethod {
        AcquisitionMethod::Ocr
    }

    async fn extract(&self, document: &Document) -> Result<ExtractedText> {
        let page_count = self.renderer.page_count(document).await?;
        if page_count == 0 {
            return Err(anyhow!("Document has no pages to recognize"));
        }

        let workdir = tempfile::tempdir().context("Failed to create OCR scratch directory")?;
        let pdf_path = workdir.path().join("document.pdf");
        tokio::fs::write(&pdf_path, &document.bytes)
            .await
            .context("Failed to stage document for OCR")?;

        // Each page future owns its inputs, so the stream borrows nothing from `self`
        let out_dir = workdir.path().to_path_buf();
        let page_jobs: Vec<_> = (1..=page_count)
            .map(|page| {
                let renderer = Arc::clone(&self.renderer);
                let engine = Arc::clone(&self.engine);
                let language = self.language.clone();
                let pdf_path = pdf_path.clone();
                let out_dir = out_dir.clone();
                async move {
                    let result: Result<String> = async {
                        let image = renderer.render_page(&pdf_path, page, &out_dir).await?;
                        engine.recognize(&image, &language).await
                    }
                    .await;
                    (page, result)
                }
            })
            .collect();

        let mut results = stream::iter(page_jobs)
            .buffer_unordered(self.concurrency)
            .collect::<Vec<_>>()
            .await;

        // Completion order is arbitrary; page order is not
        results.sort_by_key(|(page, _)| *page);

        let mut pages = Vec::with_capacity(page_count);
        let mut failures = Vec::new();
        for (page, result) in results {
            match result {
                Ok(text) => {
                    debug!("OCR page {}/{}: {} characters", page, page_count, text.chars().count());
                    pages.push(text);
                }
                Err(e) => {
                    warn!("OCR failed for page {} of {}: {:#}", page, document.filename, e);
                    failures.push(format!("page {}: {:#}", page, e));
                    pages.push(String::new());
                }
            }
        }

        if failures.len() == page_count {
            return Err(anyhow!("OCR failed on every page ({})", failures.join("; ")));
        }

        Ok(ExtractedText {
            text: join_pages(&pages),
            page_count,
        })
    }
}
