//! Embedding providers.
//!
//! Both backends talk plain JSON over `reqwest`: the OpenAI `/embeddings`
//! endpoint and Ollama's `/api/embed`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};

use crate::types::{AppError, Result};
use crate::utils::toml_config::{ConfigError, ProviderConfig, TalkConfig};

/// Turns text into fixed-size vectors.
///
/// The default [`embed_batch`](EmbeddingProvider::embed_batch) calls
/// [`embed`](EmbeddingProvider::embed) sequentially; backends with native
/// batching override it.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Vector size, when known before the first call
    fn dimensions(&self) -> Option<usize>;

    fn model_name(&self) -> &str;
}

/// Build the embedding provider named in `[embeddings]`
pub fn create_embedding_provider(config: &TalkConfig) -> std::result::Result<Arc<dyn EmbeddingProvider>, ConfigError> {
    let timeout = config.retry.timeout();
    match &config.embeddings {
        ProviderConfig::OpenAI { api_base, model, .. } => {
            let api_key = config
                .provider_api_key(&config.embeddings)?
                .unwrap_or_default();
            Ok(Arc::new(OpenAIEmbeddings::new(
                api_key,
                api_base.clone(),
                model.clone(),
                timeout,
            )))
        }
        ProviderConfig::Ollama { base_url, model } => Ok(Arc::new(OllamaEmbeddings::new(
            base_url.clone(),
            model.clone(),
            timeout,
        ))),
    }
}

fn http_client(timeout: std::time::Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

fn provider_error(provider: &str, message: impl std::fmt::Display) -> AppError {
    AppError::EmbeddingProvider(format!("{}: {}", provider, message))
}

// ============= OpenAI =============

pub struct OpenAIEmbeddings {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
}

impl OpenAIEmbeddings {
    pub fn new(
        api_key: String,
        api_base: String,
        model: String,
        timeout: std::time::Duration,
    ) -> Self {
        Self {
            client: http_client(timeout),
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            model,
        }
    }
}

#[derive(Serialize)]
struct OpenAIEmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct OpenAIEmbeddingResponse {
    data: Vec<OpenAIEmbeddingData>,
}

#[derive(Deserialize)]
struct OpenAIEmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIErrorDetail,
}

#[derive(Deserialize)]
struct OpenAIErrorDetail {
    message: String,
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| provider_error("OpenAI", "API returned empty response"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = "openai", batch_size = texts.len(), model = %self.model, "Embedding batch");

        let response = self
            .client
            .post(format!("{}/embeddings", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&OpenAIEmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| {
                error!(provider = "openai", error = %e, "Embedding request failed");
                provider_error("OpenAI", format!("request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<OpenAIErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            error!(provider = "openai", %status, "Embedding API error");
            return Err(provider_error(
                "OpenAI",
                format!("API returned {}: {}", status, detail),
            ));
        }

        let parsed: OpenAIEmbeddingResponse = response
            .json()
            .await
            .map_err(|e| provider_error("OpenAI", format!("failed to parse response: {}", e)))?;

        let mut data = parsed.data;
        // The API documents `index` as the input position; honour it when present
        data.sort_by_key(|d| d.index.unwrap_or(usize::MAX));
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> Option<usize> {
        match self.model.as_str() {
            "text-embedding-3-small" | "text-embedding-ada-002" => Some(1536),
            "text-embedding-3-large" => Some(3072),
            _ => None,
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ============= Ollama =============

pub struct OllamaEmbeddings {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaEmbeddings {
    pub fn new(base_url: String, model: String, timeout: std::time::Duration) -> Self {
        Self {
            client: http_client(timeout),
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }
}

#[derive(Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| provider_error("Ollama", "API returned empty response"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = "ollama", batch_size = texts.len(), model = %self.model, "Embedding batch");

        let response = self
            .client
            .post(format!("{}/api/embed", self.base_url))
            .json(&OllamaEmbedRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| {
                error!(provider = "ollama", error = %e, "Embedding request failed");
                provider_error("Ollama", format!("request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(provider = "ollama", %status, "Embedding API error");
            return Err(provider_error(
                "Ollama",
                format!("API returned {}: {}", status, body),
            ));
        }

        let parsed: OllamaEmbedResponse = response
            .json()
            .await
            .map_err(|e| provider_error("Ollama", format!("failed to parse response: {}", e)))?;

        Ok(parsed.embeddings)
    }

    fn dimensions(&self) -> Option<usize> {
        None
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
