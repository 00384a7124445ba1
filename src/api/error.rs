use axum::{
    Json,
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Method {method} not allowed, expected {allow}")]
    MethodNotAllowed { method: Method, allow: Method },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Form parsing error: {0}")]
    Parse(String),

    /// Storage provider failure. `expose` controls whether the underlying
    /// message reaches the client.
    #[error("{message}: {cause:#}")]
    Upstream {
        message: &'static str,
        cause: anyhow::Error,
        expose: bool,
    },
}

impl AppError {
    pub fn upstream(message: &'static str, cause: anyhow::Error) -> Self {
        AppError::Upstream {
            message,
            cause,
            expose: false,
        }
    }

    pub fn upstream_detailed(message: &'static str, cause: anyhow::Error) -> Self {
        AppError::Upstream {
            message,
            cause,
            expose: true,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Parse(_) | AppError::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            AppError::MethodNotAllowed { method, allow } => {
                tracing::debug!("Rejected {} request, only {} is accepted", method, allow);
                let mut response =
                    (status, Json(json!({ "message": "Method not allowed" }))).into_response();
                if let Ok(value) = HeaderValue::from_str(allow.as_str()) {
                    response.headers_mut().insert(header::ALLOW, value);
                }
                response
            }
            AppError::Validation(msg) => (status, Json(json!({ "message": msg }))).into_response(),
            AppError::Parse(detail) => {
                tracing::error!("Form parsing error: {}", detail);
                (status, Json(json!({ "message": "Form parsing error" }))).into_response()
            }
            AppError::Upstream {
                message,
                cause,
                expose,
            } => {
                tracing::error!("{}: {:?}", message, cause);
                let body = if expose {
                    json!({ "message": message, "error": format!("{:#}", cause) })
                } else {
                    json!({ "message": message })
                };
                (status, Json(body)).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_method_not_allowed_sets_allow_header() {
        let response = AppError::MethodNotAllowed {
            method: Method::GET,
            allow: Method::PUT,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "PUT");
        assert_eq!(body_json(response).await["message"], "Method not allowed");
    }

    #[tokio::test]
    async fn test_upstream_detail_only_when_exposed() {
        let hidden = AppError::upstream("Upload failed", anyhow::anyhow!("bucket gone"));
        let json = body_json(hidden.into_response()).await;
        assert_eq!(json["message"], "Upload failed");
        assert!(json.get("error").is_none());

        let shown = AppError::upstream_detailed("Rename failed", anyhow::anyhow!("bucket gone"));
        let response = shown.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"], "bucket gone");
    }

    #[tokio::test]
    async fn test_parse_error_hides_detail() {
        let response = AppError::Parse("boundary missing".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({ "message": "Form parsing error" })
        );
    }
}
