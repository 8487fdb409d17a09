//! PDF text extraction.
//!
//! Uploaded bytes are written to a transient `.pdf` file, handed to
//! `pdf-extract`, and the file is removed again when the guard drops, on
//! both the success and the failure path.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;

use crate::error::MediaError;

/// Anything that can turn uploaded document bytes into plain text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, data: Vec<u8>) -> Result<String, MediaError>;
}

/// PDF text extractor backed by `pdf-extract`.
#[derive(Debug, Clone, Default)]
pub struct PdfExtractor {
    /// Directory for transient copies. `None` uses the system temp dir.
    temp_dir: Option<PathBuf>,
    /// Largest accepted input in bytes. `None` means unlimited.
    max_bytes: Option<usize>,
}

impl PdfExtractor {
    /// Create a new PDF extractor that uses the system temp directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Place transient copies in `dir` instead of the system temp dir.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Reject inputs larger than `max` bytes.
    pub fn with_max_bytes(mut self, max: usize) -> Self {
        self.max_bytes = Some(max);
        self
    }

    /// Extract all text from PDF data.
    ///
    /// Blocking; use [`TextExtractor::extract_text`] from async code.
    pub fn extract_blocking(&self, data: &[u8]) -> Result<String, MediaError> {
        if let Some(max) = self.max_bytes
            && data.len() > max
        {
            return Err(MediaError::TooLarge {
                size: data.len(),
                max,
            });
        }
        if !data.starts_with(b"%PDF") {
            return Err(MediaError::UnsupportedType {
                mime_type: "application/octet-stream (missing %PDF header)".to_string(),
            });
        }

        let mut builder = tempfile::Builder::new();
        builder.prefix("upload-").suffix(".pdf");
        let mut file = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(data)?;
        file.flush()?;

        let result = extract_from_path(file.path());
        close_quietly(file);
        let text = result?;

        tracing::debug!(bytes = data.len(), chars = text.len(), "Extracted PDF text");
        Ok(text)
    }

    /// Extract text from a PDF already on disk.
    pub fn extract_file(&self, path: &Path) -> Result<String, MediaError> {
        let data = std::fs::read(path)?;
        self.extract_blocking(&data)
    }
}

#[async_trait]
impl TextExtractor for PdfExtractor {
    async fn extract_text(&self, data: Vec<u8>) -> Result<String, MediaError> {
        let extractor = self.clone();
        tokio::task::spawn_blocking(move || extractor.extract_blocking(&data))
            .await
            .map_err(|e| MediaError::ProcessingFailed {
                reason: format!("Extraction task failed: {}", e),
            })?
    }
}

fn extract_from_path(path: &Path) -> Result<String, MediaError> {
    // pdf-extract panics on some malformed inputs instead of returning Err.
    std::panic::catch_unwind(|| pdf_extract::extract_text(path))
        .map_err(|_| MediaError::ProcessingFailed {
            reason: "PDF parser panicked on malformed input".to_string(),
        })?
        .map_err(|e| MediaError::ProcessingFailed {
            reason: format!("PDF extraction error: {:?}", e),
        })
}

fn close_quietly(file: NamedTempFile) {
    let path = file.path().to_path_buf();
    if let Err(e) = file.close() {
        tracing::warn!(path = %path.display(), "Failed to remove transient PDF: {}", e);
    }
}
