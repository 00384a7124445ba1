use super::{BlobDescriptor, BlobReader, BlobStore, PutOptions};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use std::env;
use tokio::io::AsyncReadExt;

const API_VERSION: &str = "7";

/// Client for the Vercel Blob REST API.
///
/// The write token is looked up in the environment on every call, so a
/// missing token surfaces as a failed store operation rather than a startup
/// error.
pub struct VercelBlobStore {
    client: Client,
    api_url: String,
    token_var: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PutBlobResponse {
    url: String,
    download_url: Option<String>,
    pathname: String,
    content_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListBlobEntry {
    url: String,
    download_url: Option<String>,
    pathname: String,
    size: u64,
    uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListBlobsResponse {
    blobs: Vec<ListBlobEntry>,
    cursor: Option<String>,
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    code: Option<String>,
    message: Option<String>,
}

impl VercelBlobStore {
    pub fn new(client: Client, api_url: impl Into<String>, token_var: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token_var: token_var.into(),
        }
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let token = env::var(&self.token_var)
            .map_err(|_| anyhow!("{} is not set", self.token_var))?;
        Ok(request
            .bearer_auth(token)
            .header("x-api-version", API_VERSION))
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ApiErrorBody>(&body)
            .ok()
            .map(|b| {
                format!(
                    "{}: {}",
                    b.error.code.unwrap_or_else(|| "unknown_error".to_string()),
                    b.error.message.unwrap_or_default()
                )
            })
            .unwrap_or(body);
        Err(anyhow!("Vercel Blob API returned {}: {}", status, detail))
    }

    async fn head(&self, url: &str) -> Result<ListBlobEntry> {
        let request = self
            .authorized(self.client.get(format!("{}/", self.api_url)))?
            .query(&[("url", url)]);
        Ok(Self::check(request.send().await?).await?.json().await?)
    }

    fn descriptor(put: PutBlobResponse, size: u64) -> BlobDescriptor {
        BlobDescriptor {
            download_url: put.download_url.unwrap_or_else(|| put.url.clone()),
            url: put.url,
            pathname: put.pathname,
            content_type: put.content_type,
            size,
            uploaded_at: Utc::now(),
        }
    }
}

#[async_trait]
impl BlobStore for VercelBlobStore {
    fn backend_name(&self) -> &'static str {
        "vercel"
    }

    async fn put<'a>(
        &self,
        name: &str,
        mut reader: BlobReader<'a>,
        options: PutOptions,
    ) -> Result<BlobDescriptor> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data).await?;
        let size = data.len() as u64;

        let mut request = self
            .authorized(self.client.put(format!("{}/", self.api_url)))?
            .query(&[("pathname", name)])
            .header("x-add-random-suffix", "1");
        if let Some(content_type) = &options.content_type {
            request = request.header("x-content-type", content_type);
        }

        let response = Self::check(request.body(data).send().await?).await?;
        let put: PutBlobResponse = response.json().await?;
        Ok(Self::descriptor(put, size))
    }

    async fn rename(&self, url: &str, new_name: &str) -> Result<BlobDescriptor> {
        // The API has no move; copy under the new name, then drop the source
        let request = self
            .authorized(self.client.put(format!("{}/", self.api_url)))?
            .query(&[("pathname", new_name), ("fromUrl", url)])
            .header("x-add-random-suffix", "1");
        let response = Self::check(request.send().await?).await?;
        let copied: PutBlobResponse = response.json().await?;

        self.delete(url).await?;

        let size = match self.head(&copied.url).await {
            Ok(head) => head.size,
            Err(e) => {
                tracing::warn!("Could not read size of {}: {}", copied.url, e);
                0
            }
        };
        Ok(Self::descriptor(copied, size))
    }

    async fn delete(&self, url: &str) -> Result<()> {
        let request = self
            .authorized(self.client.post(format!("{}/delete", self.api_url)))?
            .json(&json!({ "urls": [url] }));
        Self::check(request.send().await?).await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<BlobDescriptor>> {
        let mut blobs = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut request = self
                .authorized(self.client.get(format!("{}/", self.api_url)))?
                .query(&[("limit", "1000")]);
            if let Some(cursor) = &cursor {
                request = request.query(&[("cursor", cursor.as_str())]);
            }

            let page: ListBlobsResponse = Self::check(request.send().await?).await?.json().await?;
            blobs.extend(page.blobs.into_iter().map(|b| BlobDescriptor {
                download_url: b.download_url.unwrap_or_else(|| b.url.clone()),
                url: b.url,
                pathname: b.pathname,
                content_type: None,
                size: b.size,
                uploaded_at: b.uploaded_at,
            }));

            match (page.has_more, page.cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => break,
            }
        }

        blobs.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at));
        Ok(blobs)
    }
}
