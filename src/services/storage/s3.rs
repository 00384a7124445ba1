use super::{
    Access, BlobDescriptor, BlobReader, BlobStore, PutOptions, pathname_from_url, public_url,
};
use crate::utils::validation::suffixed_pathname;
use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use chrono::Utc;
use tokio::io::AsyncReadExt;

pub struct S3BlobStore {
    client: Client,
    bucket: String,
    base_url: String,
}

impl S3BlobStore {
    pub fn new(client: Client, bucket: String, base_url: String) -> Self {
        Self {
            client,
            bucket,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    fn backend_name(&self) -> &'static str {
        "s3"
    }

    async fn put<'a>(
        &self,
        name: &str,
        mut reader: BlobReader<'a>,
        options: PutOptions,
    ) -> Result<BlobDescriptor> {
        let key = suffixed_pathname(name);

        let mut data = Vec::new();
        reader.read_to_end(&mut data).await?;
        let size = data.len() as u64;

        let acl = match options.access {
            Access::Public => ObjectCannedAcl::PublicRead,
            Access::Private => ObjectCannedAcl::Private,
        };

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .acl(acl)
            .set_content_type(options.content_type.clone())
            .body(ByteStream::from(data))
            .send()
            .await?;

        let url = public_url(&self.base_url, &key);
        Ok(BlobDescriptor {
            download_url: url.clone(),
            url,
            pathname: key,
            content_type: options.content_type,
            size,
            uploaded_at: Utc::now(),
        })
    }

    async fn rename(&self, url: &str, new_name: &str) -> Result<BlobDescriptor> {
        let source_key = pathname_from_url(&self.base_url, url)?;
        let head = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&source_key)
            .send()
            .await?;

        let dest_key = suffixed_pathname(new_name);
        let res = self
            .client
            .copy_object()
            .bucket(&self.bucket)
            // copy_source must be URL encoded, same as a public path
            .copy_source(public_url(&self.bucket, &source_key))
            .key(&dest_key)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await;

        if let Err(e) = res {
            tracing::error!(
                "S3 copy_object failed: source={}/{}, dest={}, error={:?}",
                self.bucket,
                source_key,
                dest_key,
                e
            );
            return Err(e.into());
        }

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&source_key)
            .send()
            .await?;

        let url = public_url(&self.base_url, &dest_key);
        Ok(BlobDescriptor {
            download_url: url.clone(),
            url,
            pathname: dest_key,
            content_type: head.content_type,
            size: head.content_length.unwrap_or(0).max(0) as u64,
            uploaded_at: Utc::now(),
        })
    }

    async fn delete(&self, url: &str) -> Result<()> {
        let key = pathname_from_url(&self.base_url, url)?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<BlobDescriptor>> {
        let mut blobs = Vec::new();
        let mut continuation_token = None;

        loop {
            let res = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .set_continuation_token(continuation_token)
                .send()
                .await?;

            for object in res.contents.unwrap_or_default() {
                let Some(key) = object.key else { continue };
                // Flat namespace only; anything nested was not written here
                if key.contains('/') {
                    continue;
                }
                let uploaded_at = object
                    .last_modified
                    .and_then(|d| chrono::DateTime::from_timestamp(d.secs(), d.subsec_nanos()))
                    .unwrap_or_else(Utc::now);
                let url = public_url(&self.base_url, &key);
                blobs.push(BlobDescriptor {
                    download_url: url.clone(),
                    url,
                    pathname: key,
                    content_type: None,
                    size: object.size.unwrap_or(0).max(0) as u64,
                    uploaded_at,
                });
            }

            if res.is_truncated.unwrap_or(false) {
                continuation_token = res.next_continuation_token;
            } else {
                break;
            }
        }

        blobs.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at));
        Ok(blobs)
    }
}
