//! HTTP API Handlers and Routes
//!
//! REST layer built on axum. Browser identity comes from a `tower-sessions`
//! cookie that holds the key of the caller's [`Session`](crate::session::Session).
//!
//! # API Endpoints
//!
//! - `GET /` - Single-page client
//! - `GET /health` - Health check
//! - `POST /api/documents` - Upload PDFs (multipart), replacing the pending set
//! - `POST /api/process` - Build the index from the pending uploads
//! - `POST /api/ask` - Ask a question
//! - `GET /api/history` - Conversation transcript
//! - `GET /api/session` - Session status
//! - `GET /api/openapi.json` - OpenAPI document

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;

use utoipa::OpenApi;

use crate::types::{
    AskRequest, AskResponse, ConversationTurn, ProcessReport, SessionState,
    SessionStatusResponse, SkippedDocument, Source, UploadResponse,
};

/// OpenAPI description of the `/api` routes
#[derive(OpenApi)]
#[openapi(
    info(title = "talkpdf", description = "Ask questions about uploaded PDF documents"),
    paths(
        handlers::documents::upload_documents,
        handlers::documents::process_documents,
        handlers::chat::ask,
        handlers::chat::history,
        handlers::chat::session_status,
    ),
    components(schemas(
        AskRequest,
        AskResponse,
        ConversationTurn,
        ProcessReport,
        SessionState,
        SessionStatusResponse,
        SkippedDocument,
        Source,
        UploadResponse,
    )),
    tags(
        (name = "documents", description = "Upload and indexing"),
        (name = "chat", description = "Questions and transcript"),
    )
)]
pub struct ApiDoc;

pub use routes::app;
