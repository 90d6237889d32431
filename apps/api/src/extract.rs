//! Resume text extraction.
//!
//! `pdf-extract` is CPU-bound, so it runs inside `tokio::task::spawn_blocking`.

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, warn};

use crate::errors::AppError;

/// Trimmed text shorter than this is treated as an unreadable scan or an empty page.
pub const MIN_RESUME_CHARS: usize = 50;

const UNREADABLE_MESSAGE: &str =
    "Resume appears empty or too short. Make sure your PDF contains readable text.";

/// Extracted resume text. Immutable for the lifetime of a session.
#[derive(Debug, Clone)]
pub struct ResumeDocument {
    raw_text: String,
}

impl ResumeDocument {
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }
}

#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, file: Bytes) -> Result<String, AppError>;
}

/// Extracts text from PDF bytes held in memory.
pub struct PdfTextExtractor;

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract_text(&self, file: Bytes) -> Result<String, AppError> {
        let result = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&file))
            .await
            .map_err(|e| {
                // pdf-extract panics on some malformed files instead of returning an error.
                if e.is_panic() {
                    warn!("PDF extraction panicked on malformed input");
                    AppError::UnreadableDocument(UNREADABLE_MESSAGE.to_string())
                } else {
                    AppError::Internal(anyhow::anyhow!("PDF extraction task failed: {e}"))
                }
            })?;

        result.map_err(|e| {
            warn!("PDF extraction failed: {e}");
            AppError::UnreadableDocument(UNREADABLE_MESSAGE.to_string())
        })
    }
}

/// Runs the extractor and rejects documents without enough readable text.
pub async fn extract_resume(
    extractor: &dyn TextExtractor,
    file: Bytes,
) -> Result<ResumeDocument, AppError> {
    let raw_text = extractor.extract_text(file).await?;
    debug!("PDF parsed, text length: {}", raw_text.len());
    ensure_readable(raw_text)
}

fn ensure_readable(raw_text: String) -> Result<ResumeDocument, AppError> {
    if raw_text.trim().chars().count() < MIN_RESUME_CHARS {
        return Err(AppError::UnreadableDocument(UNREADABLE_MESSAGE.to_string()));
    }
    Ok(ResumeDocument { raw_text })
}

#[cfg(test)]
pub(crate) fn resume_document(raw_text: &str) -> ResumeDocument {
    ResumeDocument {
        raw_text: raw_text.to_string(),
    }
}
