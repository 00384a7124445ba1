use super::{
    BlobDescriptor, BlobReader, BlobStore, PutOptions, pathname_from_url, public_url,
};
use crate::utils::validation::suffixed_pathname;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Flat directory of blobs. The HTTP layer serves `root` under the public
/// base URL.
pub struct DiskBlobStore {
    root: PathBuf,
    base_url: String,
}

impl DiskBlobStore {
    pub async fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .with_context(|| format!("Failed to create blob directory {}", root.display()))?;
        Ok(Self {
            root,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn path_for(&self, url: &str) -> Result<PathBuf> {
        let pathname = pathname_from_url(&self.base_url, url)?;
        Ok(self.root.join(pathname))
    }

    async fn describe(&self, pathname: &str, path: &Path) -> Result<BlobDescriptor> {
        let meta = fs::metadata(path).await?;
        let uploaded_at: DateTime<Utc> = meta.modified().map(DateTime::from).unwrap_or_else(|_| Utc::now());
        let content_type = infer::get_from_path(path)
            .ok()
            .flatten()
            .map(|kind| kind.mime_type().to_string());
        let url = public_url(&self.base_url, pathname);
        Ok(BlobDescriptor {
            download_url: url.clone(),
            url,
            pathname: pathname.to_string(),
            content_type,
            size: meta.len(),
            uploaded_at,
        })
    }
}

#[async_trait]
impl BlobStore for DiskBlobStore {
    fn backend_name(&self) -> &'static str {
        "disk"
    }

    async fn put<'a>(
        &self,
        name: &str,
        mut reader: BlobReader<'a>,
        options: PutOptions,
    ) -> Result<BlobDescriptor> {
        let pathname = suffixed_pathname(name);
        let path = self.root.join(&pathname);

        let mut file = fs::File::create(&path)
            .await
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let size = tokio::io::copy(&mut reader, &mut file).await?;
        file.flush().await?;

        let url = public_url(&self.base_url, &pathname);
        Ok(BlobDescriptor {
            download_url: url.clone(),
            url,
            pathname,
            content_type: options.content_type,
            size,
            uploaded_at: Utc::now(),
        })
    }

    async fn rename(&self, url: &str, new_name: &str) -> Result<BlobDescriptor> {
        let from = self.path_for(url)?;
        if !fs::try_exists(&from).await? {
            return Err(anyhow!("Blob not found: {}", url));
        }

        let pathname = suffixed_pathname(new_name);
        let to = self.root.join(&pathname);
        fs::rename(&from, &to).await.with_context(|| {
            format!("Failed to move {} to {}", from.display(), to.display())
        })?;

        self.describe(&pathname, &to).await
    }

    async fn delete(&self, url: &str) -> Result<()> {
        let path = self.path_for(url)?;
        fs::remove_file(&path)
            .await
            .with_context(|| format!("Failed to delete {}", url))?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<BlobDescriptor>> {
        let mut blobs = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Some(pathname) = entry.file_name().to_str().map(str::to_string) else {
                tracing::warn!("Skipping non UTF-8 blob name {:?}", entry.file_name());
                continue;
            };
            blobs.push(self.describe(&pathname, &entry.path()).await?);
        }
        blobs.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at).then(a.pathname.cmp(&b.pathname)));
        Ok(blobs)
    }
}
