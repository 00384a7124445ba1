pub mod list;
pub mod manage;
pub mod types;
pub mod upload;

pub use list::*;
pub use manage::*;
pub use types::*;
pub use upload::*;

use crate::api::error::AppError;
use axum::http::Method;

/// Fallback for every method an endpoint does not accept. Never touches
/// storage.
pub async fn reject_method(method: Method, allow: Method) -> AppError {
    AppError::MethodNotAllowed { method, allow }
}
