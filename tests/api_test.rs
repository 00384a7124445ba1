use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use blob_file_manager::config::{AppConfig, StorageBackend};
use async_trait::async_trait;
use blob_file_manager::services::storage::{
    BlobDescriptor, BlobReader, BlobStore, DiskBlobStore, MemoryBlobStore, PutOptions,
    VercelBlobStore,
};
use blob_file_manager::{AppState, create_app};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "---------------------------123456789012345678901234567";

fn setup() -> (Arc<MemoryBlobStore>, Router) {
    let store = Arc::new(MemoryBlobStore::new("https://blob.example"));
    let state = AppState {
        storage: store.clone(),
        config: AppConfig::development(),
    };
    (store, create_app(state))
}

/// Store whose provider rejects every call.
struct UnavailableStore;

#[async_trait]
impl BlobStore for UnavailableStore {
    fn backend_name(&self) -> &'static str {
        "unavailable"
    }

    async fn put<'a>(
        &self,
        _name: &str,
        _reader: BlobReader<'a>,
        _options: PutOptions,
    ) -> anyhow::Result<BlobDescriptor> {
        Err(anyhow::anyhow!("access denied for key sk-live-123"))
    }

    async fn rename(&self, _url: &str, _new_name: &str) -> anyhow::Result<BlobDescriptor> {
        Err(anyhow::anyhow!("access denied for key sk-live-123"))
    }

    async fn delete(&self, _url: &str) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("access denied for key sk-live-123"))
    }

    async fn list(&self) -> anyhow::Result<Vec<BlobDescriptor>> {
        Err(anyhow::anyhow!("access denied for key sk-live-123"))
    }
}

fn app_with(storage: Arc<dyn BlobStore>) -> Router {
    create_app(AppState {
        storage,
        config: AppConfig::development(),
    })
}

fn file_part(filename: &str, content: &str) -> String {
    format!(
        "--{BOUNDARY}\r\n\
        Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
        Content-Type: text/plain\r\n\r\n\
        {content}\r\n\
        --{BOUNDARY}--\r\n"
    )
}

fn upload_request(body: String) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn upload(app: &Router, filename: &str, content: &str) -> String {
    let (status, json) = send(app, upload_request(file_part(filename, content))).await;
    assert_eq!(status, StatusCode::OK, "upload failed: {}", json);
    json["url"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_upload_returns_descriptor() {
    let (store, app) = setup();

    let (status, json) = send(&app, upload_request(file_part("a.txt", "0123456789"))).await;
    assert_eq!(status, StatusCode::OK);

    let url = json["url"].as_str().unwrap();
    assert!(url.starts_with("https://blob.example/a-"), "{}", url);
    assert!(url.ends_with(".txt"));
    assert_eq!(json["size"], 10);
    assert_eq!(json["contentType"], "text/plain");
    assert!(json["pathname"].as_str().unwrap().starts_with("a-"));

    assert_eq!(store.contents(url).unwrap().as_ref(), b"0123456789");
}

#[tokio::test]
async fn test_upload_strips_client_path() {
    let (_store, app) = setup();
    let url = upload(&app, "../../home/me/report.pdf", "%PDF").await;
    assert!(url.starts_with("https://blob.example/report-"), "{}", url);
}

#[tokio::test]
async fn test_upload_without_file_field() {
    let (store, app) = setup();
    let body = format!(
        "--{BOUNDARY}\r\n\
        Content-Disposition: form-data; name=\"comment\"\r\n\r\n\
        no file here\r\n\
        --{BOUNDARY}--\r\n"
    );

    let (status, json) = send(&app, upload_request(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json, json!({ "message": "No file uploaded" }));
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_upload_with_non_multipart_body() {
    let (store, app) = setup();
    let request = Request::builder()
        .method("PUT")
        .uri("/api/upload")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("just text"))
        .unwrap();

    let (status, json) = send(&app, request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json, json!({ "message": "Form parsing error" }));
    assert_eq!(store.operations(), 0);
}

#[tokio::test]
async fn test_upload_store_failure_hides_provider_detail() {
    let app = app_with(Arc::new(UnavailableStore));

    let (status, json) = send(&app, upload_request(file_part("a.txt", "0123456789"))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json, json!({ "message": "Upload failed" }));

    let (status, json) = send(
        &app,
        json_request("DELETE", "/api/delete", json!({ "url": "https://blob.example/a-1.txt" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json, json!({ "message": "Delete failed" }));

    let request = Request::builder().uri("/api/files").body(Body::empty()).unwrap();
    let (status, json) = send(&app, request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json, json!({ "message": "List failed" }));
}

#[tokio::test]
async fn test_upload_without_vercel_token_is_generic_failure() {
    let store = VercelBlobStore::new(
        reqwest::Client::new(),
        "http://127.0.0.1:9",
        "BLOB_FILE_MANAGER_API_TEST_TOKEN_NEVER_SET",
    );
    let app = app_with(Arc::new(store));

    let (status, json) = send(&app, upload_request(file_part("a.txt", "0123456789"))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json, json!({ "message": "Upload failed" }));
}

#[tokio::test]
async fn test_wrong_methods_are_rejected_without_touching_storage() {
    let (store, app) = setup();

    let cases = [
        ("GET", "/api/upload", "PUT"),
        ("POST", "/api/upload", "PUT"),
        ("DELETE", "/api/upload", "PUT"),
        ("GET", "/api/rename", "POST"),
        ("PUT", "/api/rename", "POST"),
        ("DELETE", "/api/rename", "POST"),
        ("GET", "/api/delete", "DELETE"),
        ("POST", "/api/delete", "DELETE"),
        ("PATCH", "/api/delete", "DELETE"),
        ("POST", "/api/files", "GET"),
    ];

    for (method, uri, allowed) in cases {
        let request = json_request(method, uri, json!({ "url": "https://blob.example/a-1.txt" }));
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(
            response.status(),
            StatusCode::METHOD_NOT_ALLOWED,
            "{} {}",
            method,
            uri
        );
        let allow = response.headers()[header::ALLOW].to_str().unwrap();
        assert!(allow.contains(allowed), "{} {} allowed {}", method, uri, allow);
    }

    assert_eq!(store.operations(), 0);
}

#[tokio::test]
async fn test_rename_moves_blob() {
    let (store, app) = setup();
    let url = upload(&app, "a.txt", "0123456789").await;

    let (status, json) = send(
        &app,
        json_request("POST", "/api/rename", json!({ "url": url, "newName": "b.txt" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let new_url = json["url"].as_str().unwrap();
    assert!(new_url.starts_with("https://blob.example/b-"), "{}", new_url);
    assert!(new_url.ends_with(".txt"));
    assert!(store.contents(&url).is_none());
    assert_eq!(store.contents(new_url).unwrap().as_ref(), b"0123456789");
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_rename_failure_includes_cause() {
    let (_store, app) = setup();

    let (status, json) = send(
        &app,
        json_request(
            "POST",
            "/api/rename",
            json!({ "url": "https://blob.example/missing-1.txt", "newName": "b.txt" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["message"], "Rename failed");
    assert!(json["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_rename_rejects_bad_payloads_as_failures() {
    let (_store, app) = setup();

    let bad_bodies = [
        json!({ "url": "https://blob.example/a-1.txt" }),
        json!({ "url": "https://blob.example/a-1.txt", "newName": "" }),
        json!({ "url": "not a url", "newName": "b.txt" }),
    ];
    for body in bad_bodies {
        let (status, json) = send(&app, json_request("POST", "/api/rename", body.clone())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{}", body);
        assert_eq!(json["message"], "Rename failed");
        assert!(json["error"].is_string());
    }
}

#[tokio::test]
async fn test_delete_removes_blob() {
    let (store, app) = setup();
    let url = upload(&app, "a.txt", "0123456789").await;

    let (status, json) = send(&app, json_request("DELETE", "/api/delete", json!({ "url": url }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({ "message": "File deleted" }));
    assert!(store.is_empty());

    let (status, json) = send(&app, json_request("DELETE", "/api/delete", json!({ "url": url }))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json, json!({ "message": "Delete failed" }));
}

#[tokio::test]
async fn test_list_in_upload_order() {
    let (_store, app) = setup();
    let first = upload(&app, "one.txt", "1").await;
    let second = upload(&app, "two.txt", "2").await;

    let request = Request::builder()
        .uri("/api/files")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);

    let urls: Vec<&str> = json["blobs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["url"].as_str().unwrap())
        .collect();
    assert_eq!(urls, vec![first.as_str(), second.as_str()]);
}

#[tokio::test]
async fn test_health_and_request_id() {
    let (_store, app) = setup();

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-42")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-42");

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["storage"], "memory");

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert!(!response.headers()["x-request-id"].is_empty());
}

#[tokio::test]
async fn test_openapi_document_lists_endpoints() {
    let (_store, app) = setup();
    let request = Request::builder()
        .uri("/api-docs/openapi.json")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    for path in ["/api/upload", "/api/rename", "/api/delete", "/api/files", "/health"] {
        assert!(json["paths"].get(path).is_some(), "missing {}", path);
    }
}

#[tokio::test]
async fn test_disk_backend_serves_uploaded_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig {
        backend: StorageBackend::Disk,
        disk_root: dir.path().to_path_buf(),
        public_base_url: "http://localhost:3000/blobs".to_string(),
        ..AppConfig::default()
    };
    let store: Arc<dyn BlobStore> = Arc::new(
        DiskBlobStore::new(config.disk_root.clone(), config.public_base_url.clone())
            .await
            .unwrap(),
    );
    let app = create_app(AppState {
        storage: store,
        config,
    });

    let url = upload(&app, "hello.txt", "served from disk").await;
    let path = url.strip_prefix("http://localhost:3000").unwrap();

    let response = app
        .clone()
        .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body.as_ref(), b"served from disk");
}
