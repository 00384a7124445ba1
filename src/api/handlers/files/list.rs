use super::types::*;
use crate::AppState;
use crate::api::error::AppError;
use axum::{Json, extract::State};

#[utoipa::path(
    get,
    path = "/api/files",
    responses(
        (status = 200, description = "Blobs currently held by the store, oldest first", body = ListResponse),
        (status = 405, description = "Method not allowed", body = MessageResponse),
        (status = 500, description = "List failed", body = MessageResponse)
    ),
    tag = "files"
)]
pub async fn list_files(State(state): State<AppState>) -> Result<Json<ListResponse>, AppError> {
    let blobs = state
        .storage
        .list()
        .await
        .map_err(|e| AppError::upstream("List failed", e))?;
    Ok(Json(ListResponse { blobs }))
}
