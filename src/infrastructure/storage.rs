use crate::config::{AppConfig, StorageBackend};
use crate::services::storage::{
    BlobStore, DiskBlobStore, MemoryBlobStore, S3BlobStore, VercelBlobStore,
};
use anyhow::{Result, anyhow};
use aws_sdk_s3::config::Region;
use std::sync::Arc;
use tracing::info;

pub async fn setup_storage(config: &AppConfig) -> Result<Arc<dyn BlobStore>> {
    let store: Arc<dyn BlobStore> = match config.backend {
        StorageBackend::Memory => {
            info!("🧠 Memory Storage: {}", config.public_base_url);
            Arc::new(MemoryBlobStore::new(config.public_base_url.clone()))
        }
        StorageBackend::Disk => {
            info!(
                "💾 Disk Storage: {} (served at {})",
                config.disk_root.display(),
                config.public_base_url
            );
            Arc::new(
                DiskBlobStore::new(config.disk_root.clone(), config.public_base_url.clone())
                    .await?,
            )
        }
        StorageBackend::S3 => Arc::new(setup_s3(config).await?),
        StorageBackend::Vercel => {
            info!(
                "▲ Vercel Blob: {} (token from ${})",
                config.vercel_api_url, config.token_var
            );
            Arc::new(VercelBlobStore::new(
                reqwest::Client::new(),
                config.vercel_api_url.clone(),
                config.token_var.clone(),
            ))
        }
    };
    Ok(store)
}

async fn setup_s3(config: &AppConfig) -> Result<S3BlobStore> {
    let s3 = &config.s3;
    if s3.access_key.is_empty() || s3.secret_key.is_empty() {
        return Err(anyhow!("S3_ACCESS_KEY and S3_SECRET_KEY must be set"));
    }

    info!(
        "☁️  S3 Storage: {} (Bucket: {})",
        s3.endpoint.as_deref().unwrap_or("aws"),
        s3.bucket
    );

    let mut loader = aws_config::from_env()
        .region(Region::new(s3.region.clone()))
        .credentials_provider(aws_sdk_s3::config::Credentials::new(
            s3.access_key.clone(),
            s3.secret_key.clone(),
            None,
            None,
            "static",
        ));
    if let Some(endpoint) = &s3.endpoint {
        loader = loader.endpoint_url(endpoint);
    }
    let aws_config = loader.load().await;

    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(s3.endpoint.is_some())
        .build();

    let s3_client = aws_sdk_s3::Client::from_conf(s3_config);

    // Ensure bucket exists
    match s3_client.head_bucket().bucket(&s3.bucket).send().await {
        Ok(_) => info!("✅ Bucket '{}' is ready", s3.bucket),
        Err(_) => {
            info!("🪣 Bucket '{}' not found, creating...", s3.bucket);
            if let Err(e) = s3_client.create_bucket().bucket(&s3.bucket).send().await {
                tracing::error!("❌ Failed to create bucket '{}': {}", s3.bucket, e);
            } else {
                info!("✅ Bucket '{}' created successfully", s3.bucket);
            }
        }
    }

    Ok(S3BlobStore::new(
        s3_client,
        s3.bucket.clone(),
        config.public_base_url.clone(),
    ))
}
