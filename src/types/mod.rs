use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============= API Request/Response Types =============

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AskResponse {
    pub answer: String,
    pub sources: Vec<Source>,
    /// Fraction of the answer's content words found in the retrieved context
    pub context_overlap: f32,
    pub history_len: usize,
    pub asked_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub pending: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProcessReport {
    pub documents: usize,
    pub pages: usize,
    pub chunks: usize,
    pub skipped: Vec<SkippedDocument>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SkippedDocument {
    pub document_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Source {
    pub document_id: String,
    pub page: u32,
    pub score: f32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionStatusResponse {
    pub state: SessionState,
    pub pending: Vec<String>,
    pub chunks: usize,
    pub turns: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Empty,
    Indexed,
}

// ============= Document Types =============

/// One uploaded file, held only until its text has been extracted.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub content: Vec<u8>,
}

impl Document {
    pub fn new(id: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub document_id: String,
    /// 1-based page number
    pub number: u32,
    pub text: String,
}

/// A passage cut from a single page; the unit of embedding and retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position in the chunk sequence of the whole batch
    pub position: usize,
    pub document_id: String,
    pub page: u32,
    /// Byte offset of `text` inside the page text
    pub offset: usize,
    pub text: String,
}

// ============= Conversation Types =============

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
    pub asked_at: DateTime<Utc>,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Unreadable document: {0}")]
    UnreadableDocument(String),

    #[error("Embedding provider error: {0}")]
    EmbeddingProvider(String),

    #[error("Index has not been built")]
    IndexNotBuilt,

    #[error("No documents have been processed yet. Upload PDFs and process them first.")]
    NoIndexAvailable,

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Upload too large: {0}")]
    UploadTooLarge(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable name, returned alongside the message.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::UnreadableDocument(_) => "unreadable_document",
            AppError::EmbeddingProvider(_) => "embedding_provider_error",
            AppError::IndexNotBuilt => "index_not_built",
            AppError::NoIndexAvailable => "no_index_available",
            AppError::Generation(_) => "generation_error",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::UploadTooLarge(_) => "upload_too_large",
            AppError::Config(_) => "config_error",
            AppError::Internal(_) => "internal_error",
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match &self {
            AppError::UnreadableDocument(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::EmbeddingProvider(_) | AppError::Generation(_) => StatusCode::BAD_GATEWAY,
            AppError::IndexNotBuilt | AppError::NoIndexAvailable => StatusCode::CONFLICT,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::UploadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "kind": self.kind(),
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
