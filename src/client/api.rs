use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use thiserror::Error;

/// A file chosen for upload but not yet sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub name: String,
    pub data: Bytes,
    pub content_type: Option<String>,
}

impl PendingFile {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            content_type: None,
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".to_string());
        Ok(Self::new(name, data))
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{operation} returned {status}: {message}")]
    Status {
        operation: &'static str,
        status: u16,
        message: String,
    },
}

/// The server operations the file manager needs.
#[async_trait]
pub trait FileApi: Send + Sync {
    /// Returns the public URL of the stored file.
    async fn upload(&self, file: &PendingFile) -> Result<String, ClientError>;
    /// Returns the URL that replaces `url`.
    async fn rename(&self, url: &str, new_name: &str) -> Result<String, ClientError>;
    async fn delete(&self, url: &str) -> Result<(), ClientError>;
    async fn list(&self) -> Result<Vec<String>, ClientError>;
}

#[derive(Deserialize)]
struct UrlBody {
    url: String,
}

#[derive(Deserialize)]
struct ListBody {
    blobs: Vec<UrlBody>,
}

#[derive(Deserialize)]
struct MessageBody {
    message: Option<String>,
    error: Option<String>,
}

pub struct HttpFileApi {
    client: Client,
    base_url: String,
}

impl HttpFileApi {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check(operation: &'static str, response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<MessageBody>(&text) {
            Ok(MessageBody {
                message: Some(m),
                error: Some(e),
            }) => format!("{} ({})", m, e),
            Ok(MessageBody {
                message: Some(m), ..
            }) => m,
            _ => text,
        };
        Err(ClientError::Status {
            operation,
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl FileApi for HttpFileApi {
    async fn upload(&self, file: &PendingFile) -> Result<String, ClientError> {
        let mut part = Part::bytes(file.data.to_vec()).file_name(file.name.clone());
        if let Some(content_type) = &file.content_type {
            part = part.mime_str(content_type)?;
        }
        let form = Form::new().part("file", part);

        let response = self
            .client
            .put(self.endpoint("/api/upload"))
            .multipart(form)
            .send()
            .await?;
        let body: UrlBody = Self::check("upload", response).await?.json().await?;
        Ok(body.url)
    }

    async fn rename(&self, url: &str, new_name: &str) -> Result<String, ClientError> {
        let response = self
            .client
            .post(self.endpoint("/api/rename"))
            .json(&json!({ "url": url, "newName": new_name }))
            .send()
            .await?;
        let body: UrlBody = Self::check("rename", response).await?.json().await?;
        Ok(body.url)
    }

    async fn delete(&self, url: &str) -> Result<(), ClientError> {
        let response = self
            .client
            .delete(self.endpoint("/api/delete"))
            .json(&json!({ "url": url }))
            .send()
            .await?;
        Self::check("delete", response).await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, ClientError> {
        let response = self.client.get(self.endpoint("/api/files")).send().await?;
        let body: ListBody = Self::check("list", response).await?.json().await?;
        Ok(body.blobs.into_iter().map(|b| b.url).collect())
    }
}
