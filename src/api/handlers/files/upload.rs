use crate::AppState;
use crate::api::error::AppError;
use crate::services::storage::{Access, BlobDescriptor, PutOptions};
use crate::utils::validation::{detect_content_type, sanitize_filename};
use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::{Field, MultipartRejection},
    },
};
use futures::TryStreamExt;
use std::io::Cursor;
use tempfile::NamedTempFile;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::io::StreamReader;

const SNIFF_LEN: u64 = 512;

/// A file part fully written to local disk, waiting to be forwarded.
struct StagedUpload {
    temp: NamedTempFile,
    filename: String,
    content_type: Option<String>,
    size: u64,
}

async fn stage_field(field: Field<'_>) -> Result<StagedUpload, AppError> {
    let filename = field
        .file_name()
        .and_then(|name| sanitize_filename(name).ok())
        .unwrap_or_else(|| "unnamed".to_string());
    let content_type = field.content_type().map(|s| s.to_string());

    let temp = tempfile::Builder::new()
        .prefix("upload-")
        .tempfile()
        .map_err(|e| AppError::Parse(format!("Failed to create temporary file: {}", e)))?;
    let mut out = tokio::fs::File::from_std(
        temp.reopen()
            .map_err(|e| AppError::Parse(format!("Failed to open temporary file: {}", e)))?,
    );

    let mut reader = StreamReader::new(field.map_err(std::io::Error::other));
    let size = tokio::io::copy(&mut reader, &mut out)
        .await
        .map_err(|e| AppError::Parse(e.to_string()))?;
    out.flush()
        .await
        .map_err(|e| AppError::Parse(e.to_string()))?;

    Ok(StagedUpload {
        temp,
        filename,
        content_type,
        size,
    })
}

#[utoipa::path(
    put,
    path = "/api/upload",
    request_body(content = String, description = "Multipart form with a single `file` field", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File stored", body = BlobDescriptor),
        (status = 400, description = "No file uploaded", body = super::types::MessageResponse),
        (status = 405, description = "Method not allowed", body = super::types::MessageResponse),
        (status = 500, description = "Form parsing error or upload failed", body = super::types::MessageResponse)
    ),
    tag = "files"
)]
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<BlobDescriptor>, AppError> {
    let mut multipart = multipart.map_err(|e| AppError::Parse(e.body_text()))?;
    let mut staged: Option<StagedUpload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Parse(e.body_text()))?
    {
        // Only the first file part named `file` counts
        if staged.is_none() && field.name() == Some("file") && field.file_name().is_some() {
            staged = Some(stage_field(field).await?);
        }
    }

    let staged = staged.ok_or_else(|| {
        tracing::warn!("No file uploaded");
        AppError::Validation("No file uploaded".to_string())
    })?;

    let mut file = tokio::fs::File::from_std(
        staged
            .temp
            .reopen()
            .map_err(|e| AppError::upstream("Upload failed", e.into()))?,
    );
    let mut header = Vec::new();
    (&mut file)
        .take(SNIFF_LEN)
        .read_to_end(&mut header)
        .await
        .map_err(|e| AppError::upstream("Upload failed", e.into()))?;

    let content_type = detect_content_type(staged.content_type.as_deref(), &header);
    let reader = Box::new(Cursor::new(header).chain(file));

    let descriptor = state
        .storage
        .put(
            &staged.filename,
            reader,
            PutOptions {
                content_type: Some(content_type),
                access: Access::Public,
            },
        )
        .await
        .map_err(|e| AppError::upstream("Upload failed", e))?;

    tracing::info!(
        "📦 Stored {} ({} bytes) at {}",
        staged.filename,
        staged.size,
        descriptor.url
    );

    Ok(Json(descriptor))
}
