//! LLM client abstraction and provider selection
//!
//! - **OpenAI**: chat completions over `reqwest` (also OpenAI-compatible APIs)
//! - **Ollama**: local inference through `ollama-rs` (feature `ollama`)

use crate::types::{AppError, Result};
use crate::utils::toml_config::{ProviderConfig, TalkConfig};
use async_trait::async_trait;
use std::time::Duration;

/// Generic LLM client trait for provider abstraction
///
/// The QA engine and the session controller only ever see this trait, so
/// providers can be swapped through configuration alone.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate a completion from a prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate with conversation history
    async fn generate_with_history(
        &self,
        messages: &[(String, String)], // (role, content) pairs
    ) -> Result<String>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Provider enum for runtime selection
#[derive(Debug, Clone)]
pub enum Provider {
    /// OpenAI API provider (including compatible APIs)
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::OpenAI {
    ///     api_key: "sk-...".to_string(),
    ///     api_base: "https://api.openai.com/v1".to_string(),
    ///     model: "gpt-5-nano".to_string(),
    ///     timeout: Duration::from_secs(60),
    /// };
    /// ```
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
        timeout: Duration,
    },

    /// Ollama local LLM provider
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::Ollama {
    ///     base_url: "http://localhost:11434".to_string(),
    ///     model: "llama3.2".to_string(),
    /// };
    /// ```
    Ollama { base_url: String, model: String },
}

impl Provider {
    /// Resolve the `[llm]` section into a provider, reading the API key from
    /// the environment variable it names.
    pub fn from_config(config: &TalkConfig) -> Result<Self> {
        match &config.llm {
            ProviderConfig::OpenAI {
                api_base, model, ..
            } => Ok(Provider::OpenAI {
                api_key: config.provider_api_key(&config.llm)?.unwrap_or_default(),
                api_base: api_base.clone(),
                model: model.clone(),
                timeout: config.retry.timeout(),
            }),
            ProviderConfig::Ollama { base_url, model } => Ok(Provider::Ollama {
                base_url: base_url.clone(),
                model: model.clone(),
            }),
        }
    }

    /// Create a client instance for this provider
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the provider was compiled out.
    pub fn create_client(&self) -> Result<Box<dyn LLMClient>> {
        match self {
            Provider::OpenAI {
                api_key,
                api_base,
                model,
                timeout,
            } => Ok(Box::new(super::openai::OpenAIClient::new(
                api_key.clone(),
                api_base.clone(),
                model.clone(),
                *timeout,
            ))),

            #[cfg(feature = "ollama")]
            Provider::Ollama { base_url, model } => Ok(Box::new(
                super::ollama::OllamaClient::new(base_url.clone(), model.clone())?,
            )),

            #[cfg(not(feature = "ollama"))]
            Provider::Ollama { model, .. } => Err(AppError::Config(format!(
                "Ollama support is not compiled in (requested model '{}'). \
                 Rebuild with `--features ollama` or use the openai provider.",
                model
            ))),
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAI { .. } => "OpenAI",
            Provider::Ollama { .. } => "Ollama",
        }
    }
}

/// Map a provider error into a generation failure
pub(crate) fn generation_error(provider: &str, message: impl std::fmt::Display) -> AppError {
    AppError::Generation(format!("{} error: {}", provider, message))
}
