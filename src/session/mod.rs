//! Per-user session state and the three user actions.
//!
//! A [`Session`] owns the pending uploads, the current index and the
//! conversation history. The heavy lifting lives in a shared [`Pipeline`]
//! so that sessions hold nothing but their own state.

pub mod cookie_store;
pub mod store;

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::llm::{LLMClient, Provider};
use crate::rag::chunker::TextChunker;
use crate::rag::embeddings::{create_embedding_provider, EmbeddingProvider};
use crate::rag::index::{EmbeddingIndex, IndexOptions};
use crate::rag::loader::{load_documents, PdfExtractParser, PdfParser};
use crate::rag::qa::{Answer, QaEngine, QaOptions};
use crate::types::{
    AppError, ConversationTurn, Document, ProcessReport, Result, SessionState,
    SessionStatusResponse,
};
use crate::utils::retry::RetryPolicy;
use crate::utils::toml_config::TalkConfig;

pub use cookie_store::CookieRecordStore;
pub use store::SessionStore;

/// Providers and settings shared by every session
pub struct Pipeline {
    parser: Arc<dyn PdfParser>,
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    index_options: IndexOptions,
    qa: QaEngine,
}

impl Pipeline {
    /// Wire a pipeline from explicit providers and the `[rag]`/`[retry]` settings
    pub fn new(
        config: &TalkConfig,
        parser: Arc<dyn PdfParser>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LLMClient>,
    ) -> Result<Self> {
        let retry = RetryPolicy::from(&config.retry);
        Self::with_retry(config, parser, embedder, llm, retry)
    }

    /// Like [`Pipeline::new`] with an explicit retry policy
    pub fn with_retry(
        config: &TalkConfig,
        parser: Arc<dyn PdfParser>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LLMClient>,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let rag = &config.rag;
        let chunker = TextChunker::new(rag.chunk_size, rag.chunk_overlap)?;
        let index_options = IndexOptions {
            batch_size: rag.embed_batch_size,
            metric: rag.metric,
            retry,
        };
        let qa = QaEngine::new(
            embedder.clone(),
            llm,
            QaOptions::from_config(rag, retry),
        );

        Ok(Self {
            parser,
            chunker,
            embedder,
            index_options,
            qa,
        })
    }

    /// Build the production pipeline: pdf-extract parser plus the providers
    /// named in the configuration.
    pub fn from_config(config: &TalkConfig) -> Result<Self> {
        let embedder = create_embedding_provider(config)?;
        let llm: Arc<dyn LLMClient> = Arc::from(Provider::from_config(config)?.create_client()?);

        info!(
            embeddings = config.embeddings.name(),
            embedding_model = embedder.model_name(),
            llm = config.llm.name(),
            llm_model = llm.model_name(),
            "Pipeline ready"
        );

        Self::new(config, Arc::new(PdfExtractParser::new()), embedder, llm)
    }

    pub fn qa(&self) -> &QaEngine {
        &self.qa
    }
}

/// One user's isolated state: pending uploads, index, history
pub struct Session {
    pipeline: Arc<Pipeline>,
    pending: Vec<Document>,
    index: Option<Arc<EmbeddingIndex>>,
    history: Vec<ConversationTurn>,
}

impl Session {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            pipeline,
            pending: Vec::new(),
            index: None,
            history: Vec::new(),
        }
    }

    /// Replace the pending upload set. Nothing is parsed yet.
    pub fn on_upload(&mut self, documents: Vec<Document>) -> Vec<String> {
        self.pending = documents;
        self.pending_ids()
    }

    /// Parse, chunk and embed the pending documents into a fresh index.
    ///
    /// On success the new index replaces the old one and the pending set is
    /// cleared. On any failure index, history and pending set are untouched.
    pub async fn on_process(&mut self) -> Result<ProcessReport> {
        if self.pending.is_empty() {
            return Err(AppError::InvalidInput(
                "No documents uploaded. Upload one or more PDFs first.".to_string(),
            ));
        }

        let start = Instant::now();
        let pipeline = &self.pipeline;

        let outcome = load_documents(pipeline.parser.clone(), self.pending.clone()).await?;
        for skipped in &outcome.skipped {
            warn!(document_id = %skipped.document_id, reason = %skipped.reason, "Document skipped");
        }

        let chunks = pipeline.chunker.chunk_pages(&outcome.pages);
        if chunks.is_empty() {
            return Err(AppError::UnreadableDocument(
                "No extractable text found in the uploaded documents".to_string(),
            ));
        }
        let chunk_count = chunks.len();

        let index =
            EmbeddingIndex::build(pipeline.embedder.as_ref(), chunks, &pipeline.index_options)
                .await?;

        let report = ProcessReport {
            documents: outcome.loaded_documents(),
            pages: outcome.pages.len(),
            chunks: chunk_count,
            skipped: outcome.skipped,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        self.index = Some(Arc::new(index));
        self.pending.clear();

        info!(
            documents = report.documents,
            pages = report.pages,
            chunks = report.chunks,
            skipped = report.skipped.len(),
            duration_ms = report.duration_ms,
            "Documents processed"
        );

        Ok(report)
    }

    /// Answer a question from the current index and record the turn.
    pub async fn on_ask(&mut self, question: &str) -> Result<Answer> {
        if question.trim().is_empty() {
            return Err(AppError::InvalidInput("Question must not be empty".to_string()));
        }
        let index = self.index.as_ref().ok_or(AppError::NoIndexAvailable)?;

        let (answer, history) = self
            .pipeline
            .qa
            .answer(Some(index.as_ref()), question, &self.history)
            .await?;

        self.history = history;
        Ok(answer)
    }

    /// Chronological (question, answer, timestamp) turns
    pub fn transcript(&self) -> &[ConversationTurn] {
        &self.history
    }

    pub fn status(&self) -> SessionStatusResponse {
        SessionStatusResponse {
            state: if self.index.is_some() {
                SessionState::Indexed
            } else {
                SessionState::Empty
            },
            pending: self.pending_ids(),
            chunks: self.index.as_ref().map(|i| i.len()).unwrap_or(0),
            turns: self.history.len(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.status().state
    }

    pub fn pending_ids(&self) -> Vec<String> {
        self.pending.iter().map(|d| d.id.clone()).collect()
    }

    /// Handle of the current index, if any
    pub fn index(&self) -> Option<&Arc<EmbeddingIndex>> {
        self.index.as_ref()
    }
}
