use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::debug;

use crate::document::Document;

use super::normalize::join_pages;
use super::{AcquisitionMethod, AcquisitionStrategy, ExtractedText};

/// Reads the embedded text layer of a digital PDF with pdf-extract.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextStrategy;

impl PdfTextStrategy {
    /// Per-page text of a PDF held in memory
    pub fn extract_pages(pdf_bytes: &[u8]) -> Result<Vec<String>> {
        pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
            .map_err(|e| anyhow!("PDF parsing failed: {}", e))
    }
}

#[async_trait]
impl AcquisitionStrategy for PdfTextStrategy {
    fn method(&self) -> AcquisitionMethod {
        AcquisitionMethod::Structural
    }

    async fn extract(&self, document: &Document) -> Result<ExtractedText> {
        let bytes = document.bytes.clone();

        // pdf-extract is CPU bound and panics on some malformed files
        let pages = tokio::task::spawn_blocking(move || Self::extract_pages(&bytes))
            .await
            .context("PDF text extraction task aborted")??;

        debug!("Text layer of {} has {} page(s)", document.filename, pages.len());

        Ok(ExtractedText {
            text: join_pages(&pages),
            page_count: pages.len(),
        })
    }
}
