//! Client side of the file manager: the page state machine, the HTTP calls it
//! makes, and the persisted display-name preference.

pub mod api;
pub mod preferences;
pub mod state;

pub use api::{ClientError, FileApi, HttpFileApi, PendingFile};
pub use preferences::{JsonFilePreferenceStore, MemoryPreferenceStore, PersistedState, PreferenceStore};
pub use state::{Dialog, FileManager, MAX_UPLOAD_SIZE, UploadOutcome, UploadPhase};
