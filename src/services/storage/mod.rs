use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;
use url::Url;
use utoipa::ToSchema;

pub mod disk;
pub mod memory;
pub mod s3;
pub mod vercel;

pub use disk::DiskBlobStore;
pub use memory::MemoryBlobStore;
pub use s3::S3BlobStore;
pub use vercel::VercelBlobStore;

/// What the store reports about a blob after writing or listing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BlobDescriptor {
    pub url: String,
    pub download_url: String,
    pub pathname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default)]
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Access {
    #[default]
    Public,
    Private,
}

#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    pub content_type: Option<String>,
    pub access: Access,
}

pub type BlobReader<'a> = Box<dyn AsyncRead + Unpin + Send + 'a>;

/// Blob storage capability behind the upload, rename, delete and list
/// endpoints. Blobs are addressed by the public URL returned from `put`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Stores the stream under `name` plus a random suffix.
    async fn put<'a>(
        &self,
        name: &str,
        reader: BlobReader<'a>,
        options: PutOptions,
    ) -> Result<BlobDescriptor>;

    /// Moves the blob at `url` to `new_name` plus a fresh random suffix.
    /// The old URL stops resolving.
    async fn rename(&self, url: &str, new_name: &str) -> Result<BlobDescriptor>;

    async fn delete(&self, url: &str) -> Result<()>;

    /// Every blob in the store, oldest upload first.
    async fn list(&self) -> Result<Vec<BlobDescriptor>>;
}

const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

pub fn public_url(base_url: &str, pathname: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        utf8_percent_encode(pathname, PATH_SEGMENT)
    )
}

/// Recovers the pathname from a URL previously built with [`public_url`].
pub fn pathname_from_url(base_url: &str, url: &str) -> Result<String> {
    let base = Url::parse(base_url).map_err(|e| anyhow!("Invalid base URL {}: {}", base_url, e))?;
    let target = Url::parse(url).map_err(|e| anyhow!("Invalid blob URL {}: {}", url, e))?;

    if base.origin() != target.origin() {
        return Err(anyhow!("URL {} does not belong to this store", url));
    }

    let prefix = base.path().trim_end_matches('/');
    let encoded = target
        .path()
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('/'))
        .ok_or_else(|| anyhow!("URL {} does not belong to this store", url))?;

    let pathname = percent_decode_str(encoded)
        .decode_utf8()
        .map_err(|e| anyhow!("Invalid blob URL {}: {}", url, e))?
        .to_string();

    if pathname.is_empty()
        || pathname == "."
        || pathname == ".."
        || pathname.contains('/')
        || pathname.contains('\\')
    {
        return Err(anyhow!("Invalid blob URL {}", url));
    }

    Ok(pathname)
}
