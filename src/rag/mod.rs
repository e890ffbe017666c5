//! Retrieval Augmented Generation (RAG) Pipeline
//!
//! Everything between an uploaded PDF and a grounded answer.
//!
//! # Module Structure
//!
//! - [`rag::loader`](crate::rag::loader) - PDF bytes to page text
//! - [`rag::chunker`](crate::rag::chunker) - Page text to overlapping passages
//! - [`rag::embeddings`](crate::rag::embeddings) - Embedding providers (OpenAI, Ollama)
//! - [`rag::index`](crate::rag::index) - Flat in-memory nearest-neighbour index
//! - [`rag::prompt`](crate::rag::prompt) - Context block and prompt assembly
//! - [`rag::grounding`](crate::rag::grounding) - Answer/context overlap heuristic
//! - [`rag::qa`](crate::rag::qa) - Question answering over an index
//!
//! # RAG Pipeline
//!
//! 1. **Ingestion** - PDFs are split into pages, then chunked and embedded
//! 2. **Storage** - Chunks and vectors held in a per-session index
//! 3. **Retrieval** - Question embedded, top-k chunks retrieved
//! 4. **Generation** - LLM answers from the retrieved context only
//!
//! # Example
//!
//! ```ignore
//! use talkpdf::rag::{chunker::TextChunker, index::{EmbeddingIndex, IndexOptions}};
//!
//! let chunker = TextChunker::new(1000, 200)?;
//! let chunks = chunker.chunk_pages(&pages);
//! let index = EmbeddingIndex::build(embedder.as_ref(), chunks, &IndexOptions::default()).await?;
//! let hits = index.query(embedder.as_ref(), "What is this about?", 10).await?;
//! ```

pub mod chunker;
pub mod embeddings;
pub mod grounding;
pub mod index;
pub mod loader;
pub mod prompt;
pub mod qa;
