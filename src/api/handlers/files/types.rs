use crate::services::storage::BlobDescriptor;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RenameRequest {
    #[validate(url(message = "url must be an absolute URL"))]
    pub url: String,
    #[validate(length(min = 1, message = "newName cannot be empty"))]
    pub new_name: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct RenameResponse {
    pub url: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct DeleteRequest {
    pub url: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ListResponse {
    pub blobs: Vec<BlobDescriptor>,
}
