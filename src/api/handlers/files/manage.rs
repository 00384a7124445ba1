use super::types::*;
use crate::AppState;
use crate::api::error::AppError;
use crate::utils::validation::sanitize_filename;
use anyhow::anyhow;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use validator::Validate;

#[utoipa::path(
    post,
    path = "/api/rename",
    request_body = RenameRequest,
    responses(
        (status = 200, description = "Blob renamed, old URL no longer valid", body = RenameResponse),
        (status = 405, description = "Method not allowed", body = MessageResponse),
        (status = 500, description = "Rename failed, `error` carries the cause", body = MessageResponse)
    ),
    tag = "files"
)]
pub async fn rename_file(
    State(state): State<AppState>,
    body: Result<Json<RenameRequest>, JsonRejection>,
) -> Result<Json<RenameResponse>, AppError> {
    let fail = |e: anyhow::Error| AppError::upstream_detailed("Rename failed", e);

    let Json(req) = body.map_err(|e| fail(anyhow!(e.body_text())))?;
    req.validate().map_err(|e| fail(anyhow!(e.to_string())))?;
    let new_name = sanitize_filename(&req.new_name).map_err(fail)?;

    let renamed = state.storage.rename(&req.url, &new_name).await.map_err(fail)?;
    tracing::info!("✏️  Renamed {} to {}", req.url, renamed.url);

    Ok(Json(RenameResponse { url: renamed.url }))
}

#[utoipa::path(
    delete,
    path = "/api/delete",
    request_body = DeleteRequest,
    responses(
        (status = 200, description = "Blob deleted", body = MessageResponse),
        (status = 405, description = "Method not allowed", body = MessageResponse),
        (status = 500, description = "Delete failed", body = MessageResponse)
    ),
    tag = "files"
)]
pub async fn delete_file(
    State(state): State<AppState>,
    body: Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Json(req) = body.map_err(|e| AppError::upstream("Delete failed", anyhow!(e.body_text())))?;

    state
        .storage
        .delete(&req.url)
        .await
        .map_err(|e| AppError::upstream("Delete failed", e))?;
    tracing::info!("🗑️  Deleted {}", req.url);

    Ok(Json(MessageResponse {
        message: "File deleted".to_string(),
    }))
}
