use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use std::path::Path;

// @module: Uploaded documents

/// A single uploaded file, held in memory for the duration of one run.
#[derive(Debug, Clone)]
pub struct Document {
    /// Name the client supplied for the file
    pub filename: String,
    /// Raw file content
    pub bytes: Bytes,
}

impl Document {
    // @creates: Document from a name and content
    pub fn new(filename: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a document from disk
    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(anyhow!("Input file does not exist: {:?}", path));
        }

        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read document: {}", path.display()))?;

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "document.pdf".to_string());

        Ok(Self::new(filename, bytes))
    }

    // @returns: Size in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    // @checks: Empty content
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    // @checks: Filename carries a .pdf extension
    pub fn has_pdf_name(&self) -> bool {
        is_pdf_filename(&self.filename)
    }
}

/// Whether a client-supplied filename names a PDF (case-insensitive)
pub fn is_pdf_filename(filename: &str) -> bool {
    filename.to_lowercase().ends_with(".pdf")
}
