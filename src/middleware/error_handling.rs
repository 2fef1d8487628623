// ============================================================================
// Error Handling - CSRF Rejection
// ============================================================================
//
// 🔒 SECURITY: Every CSRF failure (no token sent, token revoked, mismatch,
// missing session, unreadable body) collapses into ONE error value. Clients
// can't tell which check failed, so the rejection leaks nothing about the
// stored token.
//
// The guard never renders a response itself: the middleware returns
// `Err(InvalidCsrfTokenError)` and axum turns it into a response through
// `IntoResponse` below.
//
// ============================================================================

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::config::ErrorConfig;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct InvalidCsrfTokenError {
    pub status_code: StatusCode,
    pub message: String,
    pub code: Option<String>,
}

impl InvalidCsrfTokenError {
    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }

    /// Machine-readable code (`EBADCSRFTOKEN` by default)
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }
}

impl From<&ErrorConfig> for InvalidCsrfTokenError {
    fn from(config: &ErrorConfig) -> Self {
        Self {
            status_code: config.status_code,
            message: config.message.clone(),
            code: config.code.clone(),
        }
    }
}

impl IntoResponse for InvalidCsrfTokenError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status_code.as_u16(),
            "code": self.code,
        }));

        (self.status_code, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn test_from_default_config() {
        let error = InvalidCsrfTokenError::from(&ErrorConfig::default());

        assert_eq!(error.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(error.to_string(), "invalid csrf token");
        assert_eq!(error.code(), Some("EBADCSRFTOKEN"));
    }

    #[tokio::test]
    async fn test_into_response() {
        let error = InvalidCsrfTokenError::from(
            &ErrorConfig::default()
                .status_code(StatusCode::BAD_REQUEST)
                .message("bad token"),
        );

        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "bad token");
        assert_eq!(body["status"], 400);
        assert_eq!(body["code"], "EBADCSRFTOKEN");
    }

    #[tokio::test]
    async fn test_into_response_without_code() {
        let error = InvalidCsrfTokenError::from(&ErrorConfig::default().code(None));

        let body = to_bytes(error.into_response().into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(body["code"].is_null());
    }
}
