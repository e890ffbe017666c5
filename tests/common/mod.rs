//! Shared test helpers.

#![allow(dead_code)]

pub mod mocks;

use std::sync::Arc;
use std::time::Duration;

use talkpdf::utils::retry::RetryPolicy;
use talkpdf::{EmbeddingProvider, LLMClient, PdfParser, Pipeline, TalkConfig};

use mocks::{HashingEmbedder, KeywordLLM, TextPdfParser};

/// Built-in defaults; pipelines built from it get retries disabled separately
pub fn test_config() -> TalkConfig {
    TalkConfig::default()
}

pub fn no_retry() -> RetryPolicy {
    RetryPolicy::none(Duration::from_secs(5))
}

pub fn pipeline_with(
    parser: Arc<dyn PdfParser>,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LLMClient>,
) -> Arc<Pipeline> {
    Arc::new(
        Pipeline::with_retry(&test_config(), parser, embedder, llm, no_retry())
            .expect("valid test pipeline"),
    )
}

/// Plain-text parser, bag-of-words embedder, keyword-matching model
pub fn default_pipeline() -> Arc<Pipeline> {
    pipeline_with(
        Arc::new(TextPdfParser),
        Arc::new(HashingEmbedder::new()),
        Arc::new(KeywordLLM),
    )
}
