pub mod api;
pub mod client;
pub mod config;
pub mod infrastructure;
pub mod services;
pub mod utils;

use crate::config::{AppConfig, StorageBackend};
use crate::services::storage::BlobStore;
use api::handlers::files::reject_method;
use axum::{
    Router,
    http::Method,
    middleware::from_fn,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::files::upload_file,
        api::handlers::files::rename_file,
        api::handlers::files::delete_file,
        api::handlers::files::list_files,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            services::storage::BlobDescriptor,
            api::handlers::files::RenameRequest,
            api::handlers::files::RenameResponse,
            api::handlers::files::DeleteRequest,
            api::handlers::files::MessageResponse,
            api::handlers::files::ListResponse,
            api::handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "files", description = "Blob upload, rename, delete and listing"),
        (name = "system", description = "Service status")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn BlobStore>,
    pub config: AppConfig,
}

pub fn create_app(state: AppState) -> Router {
    let mut router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route(
            "/api/upload",
            put(api::handlers::files::upload_file)
                .fallback(|method: Method| reject_method(method, Method::PUT)),
        )
        .route(
            "/api/rename",
            post(api::handlers::files::rename_file)
                .fallback(|method: Method| reject_method(method, Method::POST)),
        )
        .route(
            "/api/delete",
            delete(api::handlers::files::delete_file)
                .fallback(|method: Method| reject_method(method, Method::DELETE)),
        )
        .route(
            "/api/files",
            get(api::handlers::files::list_files)
                .fallback(|method: Method| reject_method(method, Method::GET)),
        );

    // Disk blobs are only reachable through this server
    if state.config.backend == StorageBackend::Disk {
        router = router.nest_service("/blobs", ServeDir::new(&state.config.disk_root));
    }

    router
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers(Any),
        )
        .layer(axum::extract::DefaultBodyLimit::max(
            state.config.max_body_size,
        ))
        .with_state(state)
}
