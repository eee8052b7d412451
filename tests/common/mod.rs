/*!
 * Common test utilities for the rentura test suite
 */

use anyhow::Result;
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use rentura::acquisition::{test_pdf, OcrEngine, PageRenderer};
use rentura::app_config::{Config, OracleProvider};
use rentura::document::Document;
use rentura::errors::ProviderError;
use rentura::oracle::{Oracle, OracleRequest};

/// Installs a test logger once; `RUST_LOG=debug` shows pipeline detail
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Writes one `<name>.txt` question file per entry
pub fn create_question_dir(dir: &Path, questions: &[(&str, &str)]) -> Result<PathBuf> {
    let questions_dir = dir.join("prompts");
    fs::create_dir_all(&questions_dir)?;
    for (name, instruction) in questions {
        fs::write(questions_dir.join(format!("{}.txt", name)), instruction)?;
    }
    Ok(questions_dir)
}

/// Config for a local provider, so no API key is needed
pub fn test_config(questions_dir: &Path) -> Config {
    let mut config = Config::default();
    config.oracle.provider = OracleProvider::Ollama;
    config.evaluation.questions_dir = questions_dir.to_path_buf();
    config
}

/// A PDF with one Helvetica text line per page
pub fn make_text_pdf(pages: &[&str]) -> Vec<u8> {
    test_pdf::text_pdf(pages).expect("PDF should serialize")
}

/// Renderer stand-in for scanned documents: names an image per page
pub struct ScannedPages {
    pub pages: usize,
}

#[async_trait]
impl PageRenderer for ScannedPages {
    async fn page_count(&self, _document: &Document) -> Result<usize> {
        Ok(self.pages)
    }

    async fn render_page(&self, _pdf_path: &Path, page: usize, out_dir: &Path) -> Result<PathBuf> {
        Ok(out_dir.join(format!("seite-{}.png", page)))
    }
}

/// OCR stand-in that "recognizes" a fixed German clause per page
pub struct ScriptedOcr;

#[async_trait]
impl OcrEngine for ScriptedOcr {
    async fn recognize(&self, image: &Path, language: &str) -> Result<String> {
        let page = image
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(format!(
            "{} ({}): Der Mieter zahlt eine Kaution in Höhe von drei Nettokaltmieten. \
             Schönheitsreparaturen übernimmt der Mieter nach starrem Fristenplan.",
            page, language
        ))
    }
}

/// Bounds every call of the wrapped oracle, like the production service does
pub struct TimeoutOracle {
    inner: Arc<dyn Oracle>,
    timeout: Duration,
}

impl TimeoutOracle {
    pub fn new(inner: Arc<dyn Oracle>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl Oracle for TimeoutOracle {
    async fn ask(&self, request: &OracleRequest) -> Result<String, ProviderError> {
        match tokio::time::timeout(self.timeout, self.inner.ask(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.timeout.as_secs())),
        }
    }
}
