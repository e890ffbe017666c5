//! Document loading: uploaded PDF bytes to page-level text.
//!
//! Parsing sits behind the [`PdfParser`] trait so that tests can drive the
//! pipeline with in-memory fakes. [`PdfExtractParser`] writes each upload to a
//! scoped temporary file, extracts per-page text with `pdf-extract`, and falls
//! back to `lopdf` when `pdf-extract` errors or panics on a malformed file.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::types::{AppError, Document, Page, Result, SkippedDocument};

/// Turns one uploaded document into its pages.
pub trait PdfParser: Send + Sync {
    /// Parse a document. Pages are returned in page order, numbered from 1.
    fn parse(&self, document: &Document) -> Result<Vec<Page>>;
}

/// Pages of every readable document plus the documents that failed.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub pages: Vec<Page>,
    pub skipped: Vec<SkippedDocument>,
}

impl LoadOutcome {
    pub fn loaded_documents(&self) -> usize {
        let mut ids: Vec<&str> = self.pages.iter().map(|p| p.document_id.as_str()).collect();
        ids.dedup();
        ids.len()
    }
}

/// Load every document in upload order.
///
/// An unreadable document is recorded in [`LoadOutcome::skipped`] and does not
/// abort the batch. Fails with [`AppError::UnreadableDocument`] only when no
/// document could be read at all.
pub async fn load_documents(
    parser: Arc<dyn PdfParser>,
    documents: Vec<Document>,
) -> Result<LoadOutcome> {
    if documents.is_empty() {
        return Err(AppError::InvalidInput("No documents to load".to_string()));
    }

    // Parsing is CPU-bound and touches the filesystem
    tokio::task::spawn_blocking(move || load_documents_blocking(parser.as_ref(), &documents))
        .await
        .map_err(|e| AppError::Internal(format!("Document loader task failed: {}", e)))?
}

fn load_documents_blocking(parser: &dyn PdfParser, documents: &[Document]) -> Result<LoadOutcome> {
    let mut outcome = LoadOutcome::default();

    for document in documents {
        match parser.parse(document) {
            Ok(pages) => {
                debug!(document_id = %document.id, pages = pages.len(), "Document parsed");
                outcome.pages.extend(pages);
            }
            Err(e) => {
                warn!(document_id = %document.id, error = %e, "Skipping unreadable document");
                outcome.skipped.push(SkippedDocument {
                    document_id: document.id.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if outcome.pages.is_empty() && !outcome.skipped.is_empty() {
        let names: Vec<&str> = outcome
            .skipped
            .iter()
            .map(|s| s.document_id.as_str())
            .collect();
        return Err(AppError::UnreadableDocument(format!(
            "None of the uploaded documents could be read: {}",
            names.join(", ")
        )));
    }

    Ok(outcome)
}

/// [`PdfParser`] backed by `pdf-extract`, with a `lopdf` fallback.
#[derive(Debug, Default, Clone)]
pub struct PdfExtractParser {
    temp_dir: Option<PathBuf>,
}

impl PdfExtractParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write temp files under `dir` instead of the system temp directory
    pub fn with_temp_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: Some(dir.into()),
        }
    }
}

impl PdfParser for PdfExtractParser {
    fn parse(&self, document: &Document) -> Result<Vec<Page>> {
        // The temp file is removed when `file` drops, on every return path
        let mut builder = tempfile::Builder::new();
        builder.prefix("talkpdf-").suffix(".pdf");
        let mut file = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| AppError::Internal(format!("Failed to create temp file: {}", e)))?;
        file.write_all(&document.content)
            .and_then(|_| file.flush())
            .map_err(|e| AppError::Internal(format!("Failed to write temp file: {}", e)))?;

        let texts = extract_page_texts(file.path()).map_err(|reason| {
            AppError::UnreadableDocument(format!("'{}': {}", document.id, reason))
        })?;

        Ok(texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| Page {
                document_id: document.id.clone(),
                number: i as u32 + 1,
                text,
            })
            .collect())
    }
}

fn extract_page_texts(path: &Path) -> std::result::Result<Vec<String>, String> {
    // pdf-extract handles font encodings better but can panic on malformed files
    let primary = std::panic::catch_unwind(|| pdf_extract::extract_text_by_pages(path));

    let reason = match primary {
        Ok(Ok(pages)) => return Ok(pages),
        Ok(Err(e)) => e.to_string(),
        Err(payload) => {
            if let Some(s) = payload.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "pdf-extract panicked".to_string()
            }
        }
    };

    debug!(error = %reason, "pdf-extract failed, trying lopdf fallback");
    extract_page_texts_via_lopdf(path).map_err(|fallback| {
        format!(
            "not a readable PDF ({}; fallback: {})",
            reason, fallback
        )
    })
}

fn extract_page_texts_via_lopdf(path: &Path) -> std::result::Result<Vec<String>, String> {
    let doc = lopdf::Document::load(path).map_err(|e| e.to_string())?;

    let pages = doc.get_pages();
    if pages.is_empty() {
        return Err("document has no pages".to_string());
    }

    Ok(pages
        .keys()
        .map(|&number| doc.extract_text(&[number]).unwrap_or_default())
        .collect())
}
