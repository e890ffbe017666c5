//! TOML-based configuration for talkpdf
//!
//! Configuration is read once at startup from `talkpdf.toml`. Secrets are never
//! stored in the file: provider sections name the environment variable that
//! holds the API key, and `.env` is loaded with `dotenvy` before they are read.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::rag::index::DistanceMetric;

/// Root configuration structure loaded from talkpdf.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TalkConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Provider used to embed chunks and questions
    #[serde(default = "default_embeddings_provider")]
    pub embeddings: ProviderConfig,

    /// Provider used to generate answers
    #[serde(default = "default_llm_provider")]
    pub llm: ProviderConfig,

    #[serde(default)]
    pub rag: RagConfig,

    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for TalkConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            embeddings: default_embeddings_provider(),
            llm: default_llm_provider(),
            rag: RagConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Maximum size of one upload request in megabytes
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,

    /// Sessions idle for longer than this are dropped
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    #[serde(default)]
    pub secure_cookies: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_upload_mb() -> usize {
    50
}

fn default_session_ttl_secs() -> u64 {
    3600
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            max_upload_mb: default_max_upload_mb(),
            session_ttl_secs: default_session_ttl_secs(),
            secure_cookies: false,
        }
    }
}

// ============= Provider Configuration =============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    OpenAI {
        /// Environment variable containing API key
        #[serde(default = "default_openai_key_env")]
        api_key_env: String,
        #[serde(default = "default_openai_base")]
        api_base: String,
        model: String,
    },
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
        model: String,
    },
}

impl ProviderConfig {
    pub fn model(&self) -> &str {
        match self {
            ProviderConfig::OpenAI { model, .. } | ProviderConfig::Ollama { model, .. } => model,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProviderConfig::OpenAI { .. } => "openai",
            ProviderConfig::Ollama { .. } => "ollama",
        }
    }
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_embeddings_provider() -> ProviderConfig {
    ProviderConfig::OpenAI {
        api_key_env: default_openai_key_env(),
        api_base: default_openai_base(),
        model: "text-embedding-3-small".to_string(),
    }
}

fn default_llm_provider() -> ProviderConfig {
    ProviderConfig::OpenAI {
        api_key_env: default_openai_key_env(),
        api_base: default_openai_base(),
        model: "gpt-5-nano".to_string(),
    }
}

// ============= RAG Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Number of chunks retrieved per question
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Upper bound on the concatenated context handed to the model
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,

    #[serde(default = "default_embed_batch_size")]
    pub embed_batch_size: usize,

    #[serde(default)]
    pub metric: DistanceMetric,

    /// Rewrite follow-up questions into standalone ones before retrieval
    #[serde(default)]
    pub condense_question: bool,

    #[serde(default = "default_grounding_warn_threshold")]
    pub grounding_warn_threshold: f32,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_top_k() -> usize {
    10
}

fn default_max_context_chars() -> usize {
    12_000
}

fn default_embed_batch_size() -> usize {
    64
}

fn default_grounding_warn_threshold() -> f32 {
    0.3
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            max_context_chars: default_max_context_chars(),
            embed_batch_size: default_embed_batch_size(),
            metric: DistanceMetric::default(),
            condense_question: false,
            grounding_warn_threshold: default_grounding_warn_threshold(),
        }
    }
}

// ============= Retry Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Per-attempt timeout for provider calls
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    8_000
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RetryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),
}

impl From<ConfigError> for crate::types::AppError {
    fn from(err: ConfigError) -> Self {
        crate::types::AppError::Config(err.to_string())
    }
}

impl TalkConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load the file if it exists, otherwise fall back to defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            info!(path = %path.display(), "No configuration file found, using defaults");
            let config = Self::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: TalkConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rag = &self.rag;

        if rag.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "rag.chunk_size must be greater than 0".to_string(),
            ));
        }
        if rag.chunk_overlap >= rag.chunk_size {
            return Err(ConfigError::ValidationError(format!(
                "rag.chunk_overlap ({}) must be less than rag.chunk_size ({})",
                rag.chunk_overlap, rag.chunk_size
            )));
        }
        if rag.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "rag.top_k must be greater than 0".to_string(),
            ));
        }
        if rag.embed_batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "rag.embed_batch_size must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&rag.grounding_warn_threshold) {
            return Err(ConfigError::ValidationError(
                "rag.grounding_warn_threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.retry.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "retry.timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.server.max_upload_mb == 0 {
            return Err(ConfigError::ValidationError(
                "server.max_upload_mb must be greater than 0".to_string(),
            ));
        }

        for (section, provider) in [("embeddings", &self.embeddings), ("llm", &self.llm)] {
            if provider.model().trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "{}.model must not be empty",
                    section
                )));
            }
        }

        Ok(())
    }

    /// Get a resolved value from an env var reference
    pub fn resolve_env(&self, env_name: &str) -> Option<String> {
        std::env::var(env_name).ok().filter(|v| !v.is_empty())
    }

    /// Resolve the API key for a provider, if it needs one
    pub fn provider_api_key(&self, provider: &ProviderConfig) -> Result<Option<String>, ConfigError> {
        match provider {
            ProviderConfig::OpenAI { api_key_env, .. } => self
                .resolve_env(api_key_env)
                .map(Some)
                .ok_or_else(|| ConfigError::MissingEnvVar(api_key_env.clone())),
            ProviderConfig::Ollama { .. } => Ok(None),
        }
    }

    /// Bind address for the HTTP server
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> String {
        r#"
[server]
host = "0.0.0.0"
port = 8080
log_level = "debug"
log_format = "json"

[embeddings]
type = "ollama"
base_url = "http://localhost:11434"
model = "nomic-embed-text"

[llm]
type = "openai"
api_key_env = "TEST_OPENAI_KEY"
model = "gpt-4o-mini"

[rag]
chunk_size = 500
chunk_overlap = 50
top_k = 4
metric = "dotproduct"

[retry]
max_attempts = 5
timeout_secs = 30
"#
        .to_string()
    }

    #[test]
    fn test_parse_config() {
        let config = TalkConfig::parse(&create_test_config()).expect("Failed to parse config");

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.log_format, LogFormat::Json);
        assert_eq!(config.embeddings.name(), "ollama");
        assert_eq!(config.embeddings.model(), "nomic-embed-text");
        assert_eq!(config.llm.model(), "gpt-4o-mini");
        assert_eq!(config.rag.chunk_size, 500);
        assert_eq!(config.rag.top_k, 4);
        assert_eq!(config.rag.metric, DistanceMetric::DotProduct);
        assert_eq!(config.retry.max_attempts, 5);
        // Unset values keep their defaults
        assert_eq!(config.rag.max_context_chars, 12_000);
        assert_eq!(config.retry.initial_backoff_ms, 500);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = TalkConfig::parse("").unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.rag.chunk_size, 1000);
        assert_eq!(config.rag.chunk_overlap, 200);
        assert_eq!(config.rag.top_k, 10);
        assert_eq!(config.llm.model(), "gpt-5-nano");
        assert_eq!(config.embeddings.name(), "openai");
        assert!(!config.rag.condense_question);
    }

    #[test]
    fn test_validation_overlap_not_less_than_size() {
        let content = r#"
[rag]
chunk_size = 200
chunk_overlap = 200
"#;
        let result = TalkConfig::parse(content);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validation_zero_top_k() {
        let result = TalkConfig::parse("[rag]\ntop_k = 0\n");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_unknown_provider_type_rejected() {
        let content = r#"
[llm]
type = "llamacpp"
model = "x"
"#;
        assert!(matches!(
            TalkConfig::parse(content),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let result = TalkConfig::load("/definitely/not/here/talkpdf.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = TalkConfig::load_or_default("/definitely/not/here/talkpdf.toml").unwrap();
        assert_eq!(config.rag.chunk_size, 1000);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("talkpdf.toml");
        fs::write(&path, create_test_config()).unwrap();

        let config = TalkConfig::load(&path).unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_provider_api_key_missing() {
        let config = TalkConfig::default();
        let provider = ProviderConfig::OpenAI {
            api_key_env: "TALKPDF_TEST_UNSET_KEY".to_string(),
            api_base: default_openai_base(),
            model: "gpt-5-nano".to_string(),
        };

        let result = config.provider_api_key(&provider);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(name)) if name == "TALKPDF_TEST_UNSET_KEY"));
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let config = TalkConfig::default();
        let provider = ProviderConfig::Ollama {
            base_url: default_ollama_url(),
            model: "llama3.2".to_string(),
        };
        assert_eq!(config.provider_api_key(&provider).unwrap(), None);
    }
}
