use anyhow::{Result, anyhow};
use std::path::Path;
use uuid::Uuid;

/// Length of the random suffix appended to every stored pathname
pub const SUFFIX_LEN: usize = 16;

/// Longest pathname segment most filesystems accept, in bytes
pub const MAX_NAME_LEN: usize = 255;

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Reduces a client supplied filename to a single safe pathname segment.
pub fn sanitize_filename(filename: &str) -> Result<String> {
    // Browsers on Windows may send the full path with either separator
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim();

    if name.is_empty() || name == "." || name == ".." {
        return Err(anyhow!(ValidationError {
            code: "INVALID_FILENAME",
            message: "Filename cannot be empty".to_string(),
        }));
    }

    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        tracing::warn!("Path traversal attempt detected: {}", filename);
    }

    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_control()
                || c == ':'
                || c == '*'
                || c == '?'
                || c == '"'
                || c == '<'
                || c == '>'
                || c == '|'
                || c == '#'
                || c == '%'
            {
                '_'
            } else {
                c
            }
        })
        .collect();

    Ok(truncate_on_char_boundary(&sanitized, MAX_NAME_LEN).to_string())
}

fn truncate_on_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

pub fn random_suffix() -> String {
    Uuid::new_v4().simple().to_string()[..SUFFIX_LEN].to_string()
}

/// `report.pdf` becomes `report-<suffix>.pdf`, so uploads never overwrite
/// each other. The stem is shortened so the result stays within
/// [`MAX_NAME_LEN`] bytes.
pub fn suffixed_pathname(name: &str) -> String {
    let path = Path::new(name);
    let suffix = random_suffix();
    let budget = MAX_NAME_LEN - suffix.len() - 1;
    match (
        path.file_stem().and_then(|s| s.to_str()),
        path.extension().and_then(|e| e.to_str()),
    ) {
        (Some(stem), Some(ext)) if ext.len() < budget => {
            let stem = truncate_on_char_boundary(stem, budget - ext.len() - 1);
            format!("{}-{}.{}", stem, suffix, ext)
        }
        _ => format!("{}-{}", truncate_on_char_boundary(name, budget), suffix),
    }
}

/// Uses the declared multipart content type when present, else sniffs the
/// leading bytes.
pub fn detect_content_type(declared: Option<&str>, header: &[u8]) -> String {
    if let Some(declared) = declared.filter(|d| d.parse::<mime::Mime>().is_ok()) {
        return declared.to_string();
    }
    infer::get(header)
        .map(|kind| kind.mime_type().to_string())
        .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string())
}
