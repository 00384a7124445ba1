use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Which blob store backs the three file endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StorageBackend {
    Memory,
    Disk,
    S3,
    Vercel,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Memory => "memory",
            StorageBackend::Disk => "disk",
            StorageBackend::S3 => "s3",
            StorageBackend::Vercel => "vercel",
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "disk" => Ok(StorageBackend::Disk),
            "s3" | "minio" => Ok(StorageBackend::S3),
            "vercel" => Ok(StorageBackend::Vercel),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

/// Connection settings for an S3-compatible bucket
#[derive(Debug, Clone)]
pub struct S3Settings {
    pub endpoint: Option<String>,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub region: String,
}

impl Default for S3Settings {
    fn default() -> Self {
        Self {
            endpoint: None,
            access_key: String::new(),
            secret_key: String::new(),
            bucket: "uploads".to_string(),
            region: "us-east-1".to_string(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Storage backend (default: disk)
    pub backend: StorageBackend,

    /// Prefix of the public URLs handed out by the memory, disk and s3 backends
    /// (default: "http://localhost:3000/blobs")
    pub public_base_url: String,

    /// Directory used by the disk backend (default: "./blobs")
    pub disk_root: PathBuf,

    /// Name of the environment variable holding the Vercel write token.
    /// Read on every store call, never cached.
    pub token_var: String,

    /// Vercel Blob API endpoint (default: "https://blob.vercel-storage.com")
    pub vercel_api_url: String,

    pub s3: S3Settings,

    /// Framework request body limit in bytes (default: 64 MB).
    /// The 5 MB upload cap is a client-side rule and is not enforced here.
    pub max_body_size: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Disk,
            public_base_url: "http://localhost:3000/blobs".to_string(),
            disk_root: PathBuf::from("./blobs"),
            token_var: "BLOB_READ_WRITE_TOKEN".to_string(),
            vercel_api_url: "https://blob.vercel-storage.com".to_string(),
            s3: S3Settings::default(),
            max_body_size: 64 * 1024 * 1024, // 64 MB
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        let backend = match env::var("STORAGE_BACKEND") {
            Ok(v) => v.parse().unwrap_or_else(|e| {
                tracing::warn!("{}, falling back to {}", e, default.backend);
                default.backend
            }),
            Err(_) => default.backend,
        };

        Self {
            backend,

            public_base_url: env::var("BLOB_PUBLIC_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(default.public_base_url),

            disk_root: env::var("BLOB_DISK_ROOT")
                .map(PathBuf::from)
                .unwrap_or(default.disk_root),

            token_var: default.token_var,

            vercel_api_url: env::var("VERCEL_BLOB_API_URL").unwrap_or(default.vercel_api_url),

            s3: S3Settings {
                endpoint: env::var("S3_ENDPOINT").ok(),
                access_key: env::var("S3_ACCESS_KEY").unwrap_or(default.s3.access_key),
                secret_key: env::var("S3_SECRET_KEY").unwrap_or(default.s3.secret_key),
                bucket: env::var("S3_BUCKET").unwrap_or(default.s3.bucket),
                region: env::var("S3_REGION").unwrap_or(default.s3.region),
            },

            max_body_size: env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_body_size),
        }
    }

    /// In-memory store with stable fake URLs, for local runs and tests
    pub fn development() -> Self {
        Self {
            backend: StorageBackend::Memory,
            public_base_url: "https://blob.example".to_string(),
            ..Self::default()
        }
    }
}
