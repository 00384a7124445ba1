use blob_file_manager::client::{
    Dialog, FileApi, FileManager, HttpFileApi, PendingFile, UploadOutcome, MAX_UPLOAD_SIZE,
    state::{DELETE_FAILED, RENAME_FAILED},
};
use blob_file_manager::config::AppConfig;
use blob_file_manager::services::storage::MemoryBlobStore;
use blob_file_manager::{AppState, create_app};
use std::sync::Arc;
use tokio::net::TcpListener;

async fn spawn_server() -> (Arc<MemoryBlobStore>, String) {
    let store = Arc::new(MemoryBlobStore::new("https://blob.example"));
    let app = create_app(AppState {
        storage: store.clone(),
        config: AppConfig::development(),
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (store, format!("http://{}", addr))
}

fn manager(base_url: &str) -> FileManager {
    FileManager::new(Arc::new(HttpFileApi::new(reqwest::Client::new(), base_url)))
}

#[tokio::test]
async fn test_upload_rename_delete_through_the_server() {
    let (store, base_url) = spawn_server().await;
    let mut fm = manager(&base_url);

    fm.select_file(PendingFile::new("a.txt", "0123456789"));
    let url = match fm.upload().await {
        UploadOutcome::Uploaded(url) => url,
        other => panic!("unexpected outcome {:?}", other),
    };
    assert!(url.starts_with("https://blob.example/a-"), "{}", url);
    assert_eq!(fm.files(), &[url.clone()]);
    assert!(fm.selection().is_none());
    assert_eq!(store.len(), 1);

    fm.open_rename(url.clone());
    fm.set_draft("b.txt");
    assert!(fm.confirm_rename().await);
    assert_eq!(fm.dialog(), &Dialog::None);
    let renamed = fm.files()[0].clone();
    assert!(renamed.starts_with("https://blob.example/b-"), "{}", renamed);
    assert!(store.contents(&url).is_none());

    fm.open_delete(renamed.clone());
    assert!(fm.confirm_delete().await);
    assert!(fm.files().is_empty());
    assert!(store.is_empty());
    assert!(fm.error().is_none());
}

#[tokio::test]
async fn test_oversized_file_never_reaches_the_server() {
    let (store, base_url) = spawn_server().await;
    let mut fm = manager(&base_url);

    let big = vec![0u8; (MAX_UPLOAD_SIZE + 1) as usize];
    fm.select_file(PendingFile::new("big.bin", big));
    assert_eq!(
        fm.upload().await,
        UploadOutcome::TooLarge {
            size: MAX_UPLOAD_SIZE + 1
        }
    );
    assert!(fm.files().is_empty());
    assert_eq!(store.operations(), 0);
}

#[tokio::test]
async fn test_server_failures_surface_as_messages() {
    let (store, base_url) = spawn_server().await;
    let mut fm = manager(&base_url);
    let ghost = "https://blob.example/ghost-1.txt".to_string();

    fm.open_rename(ghost.clone());
    fm.set_draft("b.txt");
    assert!(!fm.confirm_rename().await);
    assert_eq!(fm.error(), Some(RENAME_FAILED));
    assert!(matches!(fm.dialog(), Dialog::Rename { .. }));

    fm.dismiss_dialog();
    fm.open_delete(ghost);
    assert!(!fm.confirm_delete().await);
    assert_eq!(fm.error(), Some(DELETE_FAILED));
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_refresh_picks_up_files_from_other_sessions() {
    let (_store, base_url) = spawn_server().await;

    let api = HttpFileApi::new(reqwest::Client::new(), base_url.clone());
    let first = api.upload(&PendingFile::new("one.txt", "1")).await.unwrap();
    let second = api.upload(&PendingFile::new("two.txt", "2")).await.unwrap();

    let mut fm = manager(&base_url);
    assert!(fm.files().is_empty());
    assert!(fm.refresh().await);
    assert_eq!(fm.files(), &[first, second]);
}

#[tokio::test]
async fn test_http_api_reports_status_and_message() {
    let (_store, base_url) = spawn_server().await;
    let api = HttpFileApi::new(reqwest::Client::new(), base_url);

    let err = api
        .rename("https://blob.example/ghost-1.txt", "b.txt")
        .await
        .unwrap_err();
    let text = err.to_string();
    assert!(text.contains("500"), "{}", text);
    assert!(text.contains("Rename failed"), "{}", text);
}
