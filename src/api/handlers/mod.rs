//! API request handlers.

/// Question answering, transcript and status handlers.
pub mod chat;
/// Upload and processing handlers.
pub mod documents;

use std::sync::Arc;

use tower_sessions::Session as CookieSession;

use crate::session::Session;
use crate::types::{AppError, Result};
use crate::AppState;

const SESSION_KEY: &str = "talkpdf.session";

/// Resolve the caller's session, starting a new one when the cookie is
/// missing or points at an evicted session.
pub(crate) async fn current_session(
    state: &AppState,
    cookie: &CookieSession,
) -> Result<Arc<tokio::sync::Mutex<Session>>> {
    let existing: Option<String> = cookie
        .get(SESSION_KEY)
        .await
        .map_err(|e| AppError::Internal(format!("Session cookie error: {}", e)))?;

    let (key, session) = state.sessions.get_or_create(existing.as_deref());
    if existing.as_deref() != Some(key.as_str()) {
        cookie
            .insert(SESSION_KEY, &key)
            .await
            .map_err(|e| AppError::Internal(format!("Session cookie error: {}", e)))?;
    }

    Ok(session)
}
