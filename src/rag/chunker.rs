use text_splitter::{ChunkConfig, TextSplitter};

use crate::types::{AppError, Chunk, Page, Result};

/// Splits page text into overlapping passages of bounded character length.
///
/// Boundary selection is delegated to `text-splitter`, which prefers paragraph
/// breaks, then sentences, then words, then raw characters. Pages are chunked
/// independently so a chunk never spans two pages.
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    splitter: TextSplitter<text_splitter::Characters>,
}

impl TextChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(AppError::InvalidInput(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(AppError::InvalidInput(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }

        let config = ChunkConfig::new(chunk_size)
            .with_overlap(chunk_overlap)
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;

        Ok(Self {
            chunk_size,
            chunk_overlap,
            splitter: TextSplitter::new(config),
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Chunk every page, numbering chunks across the whole batch.
    pub fn chunk_pages(&self, pages: &[Page]) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for page in pages {
            for (offset, text) in self.splitter.chunk_indices(&page.text) {
                if text.trim().is_empty() {
                    continue;
                }
                chunks.push(Chunk {
                    position: chunks.len(),
                    document_id: page.document_id.clone(),
                    page: page.number,
                    offset,
                    text: text.to_string(),
                });
            }
        }

        chunks
    }
}
