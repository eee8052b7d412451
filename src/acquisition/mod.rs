/*!
 * Text acquisition: turn an uploaded PDF into plain text.
 *
 * Strategies are tried in order. The embedded text layer is read first; when
 * it yields fewer characters than the configured threshold the document is
 * treated as a scan and handed to OCR. Whatever the last strategy produces is
 * used, however short.
 */

use anyhow::Result;
use async_trait::async_trait;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::app_config::AcquisitionConfig;
use crate::document::Document;
use crate::errors::AnalysisError;

pub mod normalize;
pub mod ocr;
pub mod structural;

pub use ocr::{OcrEngine, OcrStrategy, PageRenderer, PdftoppmRenderer, TesseractCli};
pub use structural::PdfTextStrategy;

use normalize::truncate_chars;

/// How the text of a document was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionMethod {
    /// Embedded text layer
    Structural,
    /// Rendered pages run through OCR
    Ocr,
}

impl fmt::Display for AcquisitionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structural => write!(f, "structural"),
            Self::Ocr => write!(f, "ocr"),
        }
    }
}

/// Normalized output of a single strategy
#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub text: String,
    pub page_count: usize,
}

/// Final text handed to the evaluation stage
#[derive(Debug, Clone)]
pub struct AcquiredText {
    /// Normalized text, at most `max_chars` characters
    pub text: String,
    pub method: AcquisitionMethod,
    pub page_count: usize,
    /// Character count before truncation
    pub original_chars: usize,
    pub truncated: bool,
}

impl AcquiredText {
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// One way of getting text out of a document
#[async_trait]
pub trait AcquisitionStrategy: Send + Sync {
    fn method(&self) -> AcquisitionMethod;

    /// Extract normalized text, pages in order
    async fn extract(&self, document: &Document) -> Result<ExtractedText>;
}

/// Runs the strategy chain and applies the character budget
pub struct TextAcquirer {
    strategies: Vec<Box<dyn AcquisitionStrategy>>,
    short_text_threshold: usize,
    max_chars: usize,
}

impl TextAcquirer {
    /// Acquirer with no strategies; add them with [`TextAcquirer::with_strategy`]
    pub fn new(short_text_threshold: usize, max_chars: usize) -> Self {
        Self {
            strategies: Vec::new(),
            short_text_threshold,
            max_chars,
        }
    }

    pub fn with_strategy(mut self, strategy: impl AcquisitionStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Text layer first, then pdftoppm + tesseract
    pub fn from_config(config: &AcquisitionConfig) -> Self {
        Self::new(config.short_text_threshold, config.max_chars)
            .with_strategy(PdfTextStrategy)
            .with_strategy(OcrStrategy::from_config(config))
    }

    pub fn short_text_threshold(&self) -> usize {
        self.short_text_threshold
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Acquire the text of a document.
    ///
    /// A strategy whose output reaches the threshold wins. A failing strategy
    /// passes control to the next one; if the last strategy fails, the longest
    /// non-empty short result seen so far is used instead. Only when nothing
    /// produced any text is the document reported as unreadable.
    pub async fn acquire(&self, document: &Document) -> Result<AcquiredText, AnalysisError> {
        if self.strategies.is_empty() {
            return Err(AnalysisError::Configuration(
                "No text acquisition strategy configured".to_string(),
            ));
        }

        let last = self.strategies.len() - 1;
        let mut fallback: Option<(AcquisitionMethod, ExtractedText)> = None;
        let mut failures = Vec::new();

        for (index, strategy) in self.strategies.iter().enumerate() {
            let method = strategy.method();
            match strategy.extract(document).await {
                Ok(extracted) => {
                    let chars = extracted.text.chars().count();
                    if chars >= self.short_text_threshold || index == last {
                        if chars < self.short_text_threshold {
                            warn!(
                                "{} text of {} is still short ({} characters), using it anyway",
                                method, document.filename, chars
                            );
                        }
                        return Ok(self.finish(method, extracted));
                    }

                    warn!(
                        "{} text of {} has only {} characters (threshold {}), trying next method",
                        method, document.filename, chars, self.short_text_threshold
                    );
                    let longer = fallback
                        .as_ref()
                        .map_or(true, |(_, best)| best.text.chars().count() < chars);
                    if chars > 0 && longer {
                        fallback = Some((method, extracted));
                    }
                }
                Err(e) => {
                    warn!("{} acquisition failed for {}: {:#}", method, document.filename, e);
                    failures.push(format!("{}: {:#}", method, e));
                }
            }
        }

        match fallback {
            Some((method, extracted)) => {
                warn!(
                    "Falling back to short {} text for {}",
                    method, document.filename
                );
                Ok(self.finish(method, extracted))
            }
            None => Err(AnalysisError::Acquisition(format!(
                "No text could be read from {} ({})",
                document.filename,
                failures.join("; ")
            ))),
        }
    }

    fn finish(&self, method: AcquisitionMethod, extracted: ExtractedText) -> AcquiredText {
        let original_chars = extracted.text.chars().count();
        let (text, truncated) = truncate_chars(&extracted.text, self.max_chars);
        if truncated {
            info!(
                "Truncated document text from {} to {} characters",
                original_chars, self.max_chars
            );
        }

        AcquiredText {
            text,
            method,
            page_count: extracted.page_count,
            original_chars,
            truncated,
        }
    }
}

/// Minimal PDF builder shared by unit tests, integration tests and benches
#[doc(hidden)]
pub mod test_pdf {
    use anyhow::{anyhow, Result};
    use lopdf::dictionary;
    use lopdf::{Document, Object, Stream};

    /// A PDF with one Helvetica text line per page
    pub fn text_pdf(pages: &[&str]) -> Result<Vec<u8>> {
        let mut doc = Document::with_version("1.4");

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut page_ids = Vec::new();
        for text in pages {
            let content = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", text);
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
            });
            page_ids.push(page_id);
        }

        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
            "Count" => page_ids.len() as i64,
        });

        for page_id in &page_ids {
            if let Ok(Object::Dictionary(dict)) = doc.get_object_mut(*page_id) {
                dict.set("Parent", pages_id);
            }
        }

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf)
            .map_err(|e| anyhow!("Failed to serialize PDF: {}", e))?;
        Ok(buf)
    }

    #[cfg(test)]
    pub(crate) fn make_text_pdf(pages: &[&str]) -> Vec<u8> {
        text_pdf(pages).unwrap()
    }
}
