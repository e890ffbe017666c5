//! # talkpdf
//!
//! Ask natural-language questions about a set of PDF documents and get
//! answers drawn only from their content.
//!
//! ## Overview
//!
//! talkpdf can be used in two ways:
//!
//! 1. **As a server** - Run the `talkpdf-server` binary and open the page it serves
//! 2. **As a library** - Drive a [`Session`] directly from your own code
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use talkpdf::{Pipeline, Session, TalkConfig, types::Document};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TalkConfig::load_or_default("talkpdf.toml")?;
//!     let pipeline = Arc::new(Pipeline::from_config(&config)?);
//!
//!     let mut session = Session::new(pipeline);
//!     session.on_upload(vec![Document::new("report.pdf", std::fs::read("report.pdf")?)]);
//!     session.on_process().await?;
//!
//!     let answer = session.on_ask("What is the main conclusion?").await?;
//!     println!("{}", answer.text);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ollama` | Ollama chat models through `ollama-rs` (default) |
//!
//! ## Modules
//!
//! - [`api`] - REST API handlers and routes
//! - [`cli`] - Command-line interface
//! - [`llm`] - LLM client implementations
//! - [`rag`] - Loading, chunking, embedding, retrieval and answering
//! - [`session`] - Per-user session state and the upload/process/ask actions
//! - [`types`] - Common types and error handling
//! - [`utils`] - Configuration and retry helpers

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// HTTP API handlers and routes.
pub mod api;
/// Command-line interface.
pub mod cli;
/// LLM provider clients and abstractions.
pub mod llm;
/// Retrieval Augmented Generation (RAG) components.
pub mod rag;
/// Per-user sessions.
pub mod session;
/// Core types (requests, responses, errors).
pub mod types;
/// Configuration and retry utilities.
pub mod utils;

// Re-export commonly used types
pub use llm::{LLMClient, Provider};
pub use rag::embeddings::EmbeddingProvider;
pub use rag::loader::PdfParser;
pub use session::{CookieRecordStore, Pipeline, Session, SessionStore};
pub use types::{AppError, Result};
pub use utils::toml_config::TalkConfig;

use std::sync::Arc;

use tower_sessions::ExpiredDeletion;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Configuration loaded at startup
    pub config: Arc<TalkConfig>,
    /// Live browser sessions
    pub sessions: Arc<SessionStore>,
    /// Cookie records pointing browsers at their session
    pub cookie_records: CookieRecordStore,
}

impl AppState {
    /// State with an empty session store over `pipeline`
    pub fn new(config: TalkConfig, pipeline: Arc<Pipeline>) -> Self {
        let ttl = std::time::Duration::from_secs(config.server.session_ttl_secs);
        Self {
            config: Arc::new(config),
            sessions: Arc::new(SessionStore::new(pipeline, ttl)),
            cookie_records: CookieRecordStore::new(),
        }
    }

    /// Evict idle sessions and their expired cookie records
    pub async fn sweep(&self) -> usize {
        let evicted = self.sessions.evict_idle();
        if let Err(e) = self.cookie_records.delete_expired().await {
            tracing::warn!(error = %e, "Failed to delete expired cookie records");
        }
        evicted
    }
}
