//! Document ingestion: text chunks out of a report file.
//!
//! PDFs go through `pdf-extract` (feature `pdf`); anything else is read as
//! UTF-8 text. Every failure mode ends in an empty chunk list.

use async_trait::async_trait;
use std::path::Path;

use crate::sources::DocHandle;

#[async_trait]
pub trait DocumentIngestor: Send + Sync {
    /// Ordered text chunks; empty on failure.
    async fn ingest(&self, doc: &DocHandle) -> Vec<String>;
}

#[derive(Debug, Clone, Copy)]
pub struct FileIngestor {
    chunk_chars: usize,
}

impl FileIngestor {
    pub fn new(chunk_chars: usize) -> Self {
        Self {
            chunk_chars: chunk_chars.max(1),
        }
    }
}

impl Default for FileIngestor {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[async_trait]
impl DocumentIngestor for FileIngestor {
    async fn ingest(&self, doc: &DocHandle) -> Vec<String> {
        let path = doc.path().to_path_buf();
        let chunk_chars = self.chunk_chars;
        // PDF parsing is CPU-bound and may panic on malformed input.
        match tokio::task::spawn_blocking(move || ingest_document(&path, chunk_chars)).await {
            Ok(chunks) => chunks,
            Err(e) => {
                tracing::warn!(path = %doc.path().display(), error = %e, "document ingestion aborted");
                Vec::new()
            }
        }
    }
}

pub fn ingest_document(path: &Path, chunk_chars: usize) -> Vec<String> {
    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));

    let text = if is_pdf {
        extract_pdf_text(path)
    } else {
        std::fs::read_to_string(path).ok()
    };

    match text {
        Some(text) => chunk_text(&text, chunk_chars),
        None => {
            tracing::debug!(path = %path.display(), "no text extracted from document");
            Vec::new()
        }
    }
}

#[cfg(feature = "pdf")]
fn extract_pdf_text(path: &Path) -> Option<String> {
    match pdf_extract::extract_text(path) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "pdf extraction failed");
            None
        }
    }
}

#[cfg(not(feature = "pdf"))]
fn extract_pdf_text(path: &Path) -> Option<String> {
    tracing::warn!(path = %path.display(), "PDF feature not enabled; document yields no text");
    None
}

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Page breaks (form feed) start a new chunk, so chunks never straddle pages.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    for page in text.split('\u{c}') {
        let mut current = String::new();
        let mut count = 0usize;
        for ch in page.chars() {
            current.push(ch);
            count += 1;
            if count == max_chars {
                chunks.push(std::mem::take(&mut current));
                count = 0;
            }
        }
        if !current.is_empty() {
            chunks.push(current);
        }
    }
    chunks
}
