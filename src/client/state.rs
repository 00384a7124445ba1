use super::api::{FileApi, PendingFile};
use std::sync::Arc;
use tracing::{info, warn};

/// Largest file the client will send (5 MB).
pub const MAX_UPLOAD_SIZE: u64 = 5 * 1024 * 1024;

pub const SIZE_ALERT: &str = "File size exceeds 5MB";
pub const UPLOAD_FAILED: &str = "Upload failed. Please try again.";
pub const RENAME_FAILED: &str = "Rename failed. Please try again.";
pub const DELETE_FAILED: &str = "Delete failed. Please try again.";
pub const LIST_FAILED: &str = "Could not load files. Please try again.";

/// The row action in progress. Holding at most one target makes rename and
/// delete mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Dialog {
    #[default]
    None,
    Rename { url: String, draft: String },
    Delete { url: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    Idle,
    FileSelected,
    Uploading,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    NothingSelected,
    /// Blocked before any request; the caller shows [`SIZE_ALERT`].
    TooLarge { size: u64 },
    Uploaded(String),
    Failed,
}

/// Client-side state of the file manager page.
pub struct FileManager {
    api: Arc<dyn FileApi>,
    selection: Option<PendingFile>,
    uploading: bool,
    loading: bool,
    error: Option<String>,
    files: Vec<String>,
    dialog: Dialog,
}

impl FileManager {
    pub fn new(api: Arc<dyn FileApi>) -> Self {
        Self {
            api,
            selection: None,
            uploading: false,
            loading: false,
            error: None,
            files: Vec::new(),
            dialog: Dialog::None,
        }
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dialog(&self) -> &Dialog {
        &self.dialog
    }

    pub fn selection(&self) -> Option<&PendingFile> {
        self.selection.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn phase(&self) -> UploadPhase {
        match (&self.selection, self.uploading) {
            (_, true) => UploadPhase::Uploading,
            (Some(_), false) => UploadPhase::FileSelected,
            (None, false) => UploadPhase::Idle,
        }
    }

    /// Whether the upload button is enabled.
    pub fn can_upload(&self) -> bool {
        self.selection.is_some() && !self.uploading
    }

    /// Drop or picker selection. Replaces any earlier choice.
    pub fn select_file(&mut self, file: PendingFile) {
        self.selection = Some(file);
    }

    pub async fn upload(&mut self) -> UploadOutcome {
        let Some(file) = self.selection.clone() else {
            return UploadOutcome::NothingSelected;
        };
        if file.size() > MAX_UPLOAD_SIZE {
            warn!("{} is {} bytes, over the upload limit", file.name, file.size());
            return UploadOutcome::TooLarge { size: file.size() };
        }

        self.uploading = true;
        self.error = None;
        let result = self.api.upload(&file).await;
        self.uploading = false;

        match result {
            Ok(url) => {
                info!("Uploaded {} to {}", file.name, url);
                self.files.push(url.clone());
                self.selection = None;
                UploadOutcome::Uploaded(url)
            }
            Err(e) => {
                // Selection is kept so the user can retry
                warn!("Upload of {} failed: {}", file.name, e);
                self.error = Some(UPLOAD_FAILED.to_string());
                UploadOutcome::Failed
            }
        }
    }

    pub fn open_rename(&mut self, url: impl Into<String>) {
        self.dialog = Dialog::Rename {
            url: url.into(),
            draft: String::new(),
        };
    }

    /// Edits the rename input. Ignored unless the rename dialog is open.
    pub fn set_draft(&mut self, name: impl Into<String>) {
        if let Dialog::Rename { draft, .. } = &mut self.dialog {
            *draft = name.into();
        }
    }

    /// Returns true when the rename went through and the dialog closed.
    pub async fn confirm_rename(&mut self) -> bool {
        let Dialog::Rename { url, draft } = &self.dialog else {
            return false;
        };
        if draft.is_empty() {
            return false;
        }
        let (url, draft) = (url.clone(), draft.clone());

        match self.api.rename(&url, &draft).await {
            Ok(new_url) => {
                info!("Renamed {} to {}", url, new_url);
                for entry in self.files.iter_mut().filter(|entry| **entry == url) {
                    *entry = new_url.clone();
                }
                self.dialog = Dialog::None;
                true
            }
            Err(e) => {
                warn!("Rename of {} failed: {}", url, e);
                self.error = Some(RENAME_FAILED.to_string());
                false
            }
        }
    }

    pub fn open_delete(&mut self, url: impl Into<String>) {
        self.dialog = Dialog::Delete { url: url.into() };
    }

    /// Returns true when the delete went through and the dialog closed.
    pub async fn confirm_delete(&mut self) -> bool {
        let Dialog::Delete { url } = &self.dialog else {
            return false;
        };
        let url = url.clone();

        match self.api.delete(&url).await {
            Ok(()) => {
                info!("Deleted {}", url);
                self.files.retain(|entry| *entry != url);
                self.dialog = Dialog::None;
                true
            }
            Err(e) => {
                warn!("Delete of {} failed: {}", url, e);
                self.error = Some(DELETE_FAILED.to_string());
                false
            }
        }
    }

    /// Cancel button or backdrop click. Never sends a request.
    pub fn dismiss_dialog(&mut self) {
        self.dialog = Dialog::None;
    }

    /// Rebuilds the list from the server.
    pub async fn refresh(&mut self) -> bool {
        self.loading = true;
        let result = self.api.list().await;
        self.loading = false;

        match result {
            Ok(urls) => {
                self.files = urls;
                self.error = None;
                true
            }
            Err(e) => {
                warn!("Listing files failed: {}", e);
                self.error = Some(LIST_FAILED.to_string());
                false
            }
        }
    }
}
