use crate::{
    api::handlers::current_session,
    types::{AppError, Document, ProcessReport, Result, UploadResponse},
    AppState,
};
use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use tower_sessions::Session as CookieSession;
use tracing::{debug, info};

fn upload_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::UploadTooLarge(e.body_text())
    } else {
        AppError::InvalidInput(format!("Malformed upload: {}", e.body_text()))
    }
}

/// Upload PDFs, replacing any not-yet-processed uploads
#[utoipa::path(
    post,
    path = "/api/documents",
    responses(
        (status = 200, description = "Files stored as pending", body = UploadResponse),
        (status = 400, description = "No files in the request"),
        (status = 413, description = "Upload exceeds the size limit")
    ),
    tag = "documents"
)]
pub async fn upload_documents(
    State(state): State<AppState>,
    cookie: CookieSession,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let mut documents = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        // Plain form fields and empty file inputs carry no usable file name
        let Some(id) = field
            .file_name()
            .filter(|name| !name.trim().is_empty())
            .map(str::to_string)
        else {
            debug!(field = ?field.name(), "Skipping multipart field without a file name");
            continue;
        };
        let bytes = field.bytes().await.map_err(upload_error)?;

        documents.push(Document::new(id, bytes.to_vec()));
    }

    if documents.is_empty() {
        return Err(AppError::InvalidInput(
            "Upload at least one PDF file".to_string(),
        ));
    }

    let session = current_session(&state, &cookie).await?;
    let pending = session.lock().await.on_upload(documents);
    info!(files = pending.len(), "Documents uploaded");

    Ok(Json(UploadResponse { pending }))
}

/// Extract, chunk and index the pending uploads
#[utoipa::path(
    post,
    path = "/api/process",
    responses(
        (status = 200, description = "Index built", body = ProcessReport),
        (status = 400, description = "Nothing uploaded"),
        (status = 422, description = "No uploaded file could be read"),
        (status = 502, description = "Embedding provider failed")
    ),
    tag = "documents"
)]
pub async fn process_documents(
    State(state): State<AppState>,
    cookie: CookieSession,
) -> Result<Json<ProcessReport>> {
    let session = current_session(&state, &cookie).await?;
    let report = session.lock().await.on_process().await?;
    Ok(Json(report))
}
