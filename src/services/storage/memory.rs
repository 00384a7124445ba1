use super::{
    BlobDescriptor, BlobReader, BlobStore, PutOptions, pathname_from_url, public_url,
};
use crate::utils::validation::suffixed_pathname;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::io::AsyncReadExt;

struct StoredBlob {
    seq: u64,
    descriptor: BlobDescriptor,
    data: Bytes,
}

/// Process-local store. Contents vanish with the process.
pub struct MemoryBlobStore {
    base_url: String,
    blobs: DashMap<String, StoredBlob>,
    next_seq: AtomicU64,
    operations: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            blobs: DashMap::new(),
            next_seq: AtomicU64::new(0),
            operations: AtomicUsize::new(0),
        }
    }

    /// Number of `BlobStore` calls served so far.
    pub fn operations(&self) -> usize {
        self.operations.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    pub fn contents(&self, url: &str) -> Option<Bytes> {
        let pathname = pathname_from_url(&self.base_url, url).ok()?;
        self.blobs.get(&pathname).map(|b| b.data.clone())
    }

    fn record(&self) {
        self.operations.fetch_add(1, Ordering::SeqCst);
    }

    fn insert(
        &self,
        pathname: String,
        data: Bytes,
        content_type: Option<String>,
        uploaded: Option<(u64, DateTime<Utc>)>,
    ) -> BlobDescriptor {
        let (seq, uploaded_at) = uploaded.unwrap_or_else(|| {
            (self.next_seq.fetch_add(1, Ordering::SeqCst), Utc::now())
        });
        let url = public_url(&self.base_url, &pathname);
        let descriptor = BlobDescriptor {
            download_url: format!("{}?download=1", url),
            url,
            pathname: pathname.clone(),
            content_type,
            size: data.len() as u64,
            uploaded_at,
        };
        self.blobs.insert(
            pathname,
            StoredBlob {
                seq,
                descriptor: descriptor.clone(),
                data,
            },
        );
        descriptor
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn put<'a>(
        &self,
        name: &str,
        mut reader: BlobReader<'a>,
        options: PutOptions,
    ) -> Result<BlobDescriptor> {
        self.record();
        let mut data = Vec::new();
        reader.read_to_end(&mut data).await?;
        Ok(self.insert(
            suffixed_pathname(name),
            Bytes::from(data),
            options.content_type,
            None,
        ))
    }

    async fn rename(&self, url: &str, new_name: &str) -> Result<BlobDescriptor> {
        self.record();
        let pathname = pathname_from_url(&self.base_url, url)?;
        let (_, old) = self
            .blobs
            .remove(&pathname)
            .ok_or_else(|| anyhow!("Blob not found: {}", url))?;
        // Keeps its place in the listing, like a file moved on disk
        Ok(self.insert(
            suffixed_pathname(new_name),
            old.data,
            old.descriptor.content_type,
            Some((old.seq, old.descriptor.uploaded_at)),
        ))
    }

    async fn delete(&self, url: &str) -> Result<()> {
        self.record();
        let pathname = pathname_from_url(&self.base_url, url)?;
        self.blobs
            .remove(&pathname)
            .map(|_| ())
            .ok_or_else(|| anyhow!("Blob not found: {}", url))
    }

    async fn list(&self) -> Result<Vec<BlobDescriptor>> {
        self.record();
        let mut entries: Vec<(u64, BlobDescriptor)> = self
            .blobs
            .iter()
            .map(|entry| (entry.seq, entry.descriptor.clone()))
            .collect();
        entries.sort_by_key(|(seq, _)| *seq);
        Ok(entries.into_iter().map(|(_, d)| d).collect())
    }
}
