use crate::AppState;
use axum::{
    extract::DefaultBodyLimit,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, SessionManagerLayer};
use utoipa::OpenApi;

use super::{handlers, ApiDoc};

const INDEX_HTML: &str = include_str!("index.html");

/// Routes mounted under `/api`
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/documents", post(handlers::documents::upload_documents))
        .route("/process", post(handlers::documents::process_documents))
        .route("/ask", post(handlers::chat::ask))
        .route("/history", get(handlers::chat::history))
        .route("/session", get(handlers::chat::session_status))
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
}

/// The complete application: page, health check, `/api`, session cookies,
/// upload limit, tracing and CORS.
pub fn app(state: AppState) -> Router {
    let server = &state.config.server;
    let ttl = Duration::seconds(i64::try_from(server.session_ttl_secs).unwrap_or(i64::MAX));
    // Saved on every request so the record expiry tracks activity
    let session_layer = SessionManagerLayer::new(state.cookie_records.clone())
        .with_secure(server.secure_cookies)
        .with_name("talkpdf.sid")
        .with_expiry(Expiry::OnInactivity(ttl))
        .with_always_save(true);
    let body_limit = server.max_upload_mb.saturating_mul(1024 * 1024);

    Router::new()
        .route("/", get(|| async { Html(INDEX_HTML) }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", create_router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
