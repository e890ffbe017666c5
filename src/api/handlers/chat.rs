use crate::{
    api::handlers::current_session,
    types::{AskRequest, AskResponse, ConversationTurn, Result, SessionStatusResponse},
    AppState,
};
use axum::{extract::State, Json};
use tower_sessions::Session as CookieSession;

/// Ask a question about the processed documents
#[utoipa::path(
    post,
    path = "/api/ask",
    request_body = AskRequest,
    responses(
        (status = 200, description = "Answer", body = AskResponse),
        (status = 400, description = "Empty question"),
        (status = 409, description = "No documents processed yet"),
        (status = 502, description = "Model or embedding provider failed")
    ),
    tag = "chat"
)]
pub async fn ask(
    State(state): State<AppState>,
    cookie: CookieSession,
    Json(payload): Json<AskRequest>,
) -> Result<Json<AskResponse>> {
    let session = current_session(&state, &cookie).await?;
    let mut session = session.lock().await;

    let answer = session.on_ask(&payload.question).await?;

    Ok(Json(AskResponse {
        answer: answer.text,
        sources: answer.sources,
        context_overlap: answer.context_overlap,
        history_len: session.transcript().len(),
        asked_at: answer.asked_at,
    }))
}

/// Conversation so far, oldest first
#[utoipa::path(
    get,
    path = "/api/history",
    responses((status = 200, description = "Transcript", body = [ConversationTurn])),
    tag = "chat"
)]
pub async fn history(
    State(state): State<AppState>,
    cookie: CookieSession,
) -> Result<Json<Vec<ConversationTurn>>> {
    let session = current_session(&state, &cookie).await?;
    let transcript = session.lock().await.transcript().to_vec();
    Ok(Json(transcript))
}

#[utoipa::path(
    get,
    path = "/api/session",
    responses((status = 200, description = "Session status", body = SessionStatusResponse)),
    tag = "chat"
)]
pub async fn session_status(
    State(state): State<AppState>,
    cookie: CookieSession,
) -> Result<Json<SessionStatusResponse>> {
    let session = current_session(&state, &cookie).await?;
    let status = session.lock().await.status();
    Ok(Json(status))
}
