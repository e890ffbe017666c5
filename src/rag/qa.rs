//! Retrieval-augmented question answering.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::llm::LLMClient;
use crate::rag::embeddings::EmbeddingProvider;
use crate::rag::grounding::context_overlap;
use crate::rag::index::{retrieve, EmbeddingIndex};
use crate::rag::prompt::{build_condense_prompt, build_context, build_prompt, history_messages};
use crate::types::{AppError, ConversationTurn, Result, Source};
use crate::utils::retry::{with_retry, RetryError, RetryPolicy};
use crate::utils::toml_config::RagConfig;

#[derive(Debug, Clone)]
pub struct QaOptions {
    pub top_k: usize,
    pub max_context_chars: usize,
    pub condense_question: bool,
    pub grounding_warn_threshold: f32,
    pub retry: RetryPolicy,
}

impl QaOptions {
    pub fn from_config(rag: &RagConfig, retry: RetryPolicy) -> Self {
        Self {
            top_k: rag.top_k,
            max_context_chars: rag.max_context_chars,
            condense_question: rag.condense_question,
            grounding_warn_threshold: rag.grounding_warn_threshold,
            retry,
        }
    }
}

impl Default for QaOptions {
    fn default() -> Self {
        Self::from_config(&RagConfig::default(), RetryPolicy::default())
    }
}

#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    /// One entry per chunk placed in the context, in rank order
    pub sources: Vec<Source>,
    pub context_overlap: f32,
    pub asked_at: DateTime<Utc>,
}

/// Answers questions from an [`EmbeddingIndex`] with a language model.
pub struct QaEngine {
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LLMClient>,
    options: QaOptions,
}

impl QaEngine {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LLMClient>,
        options: QaOptions,
    ) -> Self {
        Self {
            embedder,
            llm,
            options,
        }
    }

    pub fn options(&self) -> &QaOptions {
        &self.options
    }

    /// Answer `question` and return the history extended by the new turn.
    ///
    /// `history` itself is never modified; on failure the caller's history
    /// stays as it was.
    pub async fn answer(
        &self,
        index: Option<&EmbeddingIndex>,
        question: &str,
        history: &[ConversationTurn],
    ) -> Result<(Answer, Vec<ConversationTurn>)> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::InvalidInput("Question must not be empty".to_string()));
        }

        let start = Instant::now();

        let search_query = if self.options.condense_question && !history.is_empty() {
            self.condense(history, question).await?
        } else {
            question.to_string()
        };

        let ranked = retrieve(
            index,
            self.embedder.as_ref(),
            &search_query,
            self.options.top_k,
        )
        .await?;

        let (context, used) = build_context(&ranked, self.options.max_context_chars);
        if used < ranked.len() {
            debug!(
                retrieved = ranked.len(),
                kept = used,
                max_context_chars = self.options.max_context_chars,
                "Context truncated"
            );
        }

        let mut messages = history_messages(history);
        messages.push(("user".to_string(), build_prompt(&context, question)));

        let text = self.generate(&messages).await?;

        let overlap = context_overlap(&text, &context);
        if overlap < self.options.grounding_warn_threshold {
            warn!(
                context_overlap = overlap,
                threshold = self.options.grounding_warn_threshold,
                "Answer has low overlap with retrieved context"
            );
        }

        let asked_at = Utc::now();
        let answer = Answer {
            text: text.clone(),
            sources: ranked
                .iter()
                .take(used)
                .map(|s| Source {
                    document_id: s.chunk.document_id.clone(),
                    page: s.chunk.page,
                    score: s.score,
                })
                .collect(),
            context_overlap: overlap,
            asked_at,
        };

        let mut updated = history.to_vec();
        updated.push(ConversationTurn {
            question: question.to_string(),
            answer: text,
            asked_at,
        });

        info!(
            chunks = used,
            history_len = updated.len(),
            context_overlap = overlap,
            duration_ms = start.elapsed().as_millis() as u64,
            "Question answered"
        );

        Ok((answer, updated))
    }

    async fn condense(&self, history: &[ConversationTurn], question: &str) -> Result<String> {
        let prompt = build_condense_prompt(history, question);
        let standalone = self
            .generate(&[("user".to_string(), prompt)])
            .await?
            .trim()
            .to_string();

        if standalone.is_empty() {
            return Ok(question.to_string());
        }
        debug!(original = question, standalone = %standalone, "Question condensed");
        Ok(standalone)
    }

    async fn generate(&self, messages: &[(String, String)]) -> Result<String> {
        let llm = self.llm.as_ref();
        with_retry(&self.options.retry, "generate", || {
            llm.generate_with_history(messages)
        })
        .await
        .map_err(|e| match e {
            RetryError::Failed(AppError::Generation(msg)) => AppError::Generation(msg),
            RetryError::Failed(other) => AppError::Generation(other.to_string()),
            RetryError::TimedOut(t) => AppError::Generation(format!(
                "{} timed out after {}s",
                llm.model_name(),
                t.as_secs()
            )),
        })
    }
}
