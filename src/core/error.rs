//! Gateway error types
//!
//! `GatewayError` is the error taxonomy of the chat gateway. Every variant
//! except `Provider` and `Config` is rendered to the client as a JSON body
//! with an `error` field; provider failures are turned into the offline
//! fallback by the handlers before they ever reach `IntoResponse`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Failure of the external language-model call.
///
/// Carries the rendered provider error chain; the provider client itself
/// works with `anyhow` and converts at the boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Provider request failed: {message}")]
pub struct ProviderError {
    pub message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for ProviderError {
    fn from(err: anyhow::Error) -> Self {
        // Alternate formatting keeps the whole `.context(...)` chain
        Self::new(format!("{:#}", err))
    }
}

/// Errors that can occur while serving chat requests
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Required request fields were missing or the body was malformed
    #[error("{0}")]
    Validation(String),

    /// Session not found (never created, deleted, or expired)
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// External model call failed
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Unexpected failure; `detail` is only rendered outside production
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        detail: Option<String>,
    },

    /// Invalid configuration at startup
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl GatewayError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        GatewayError::Validation(msg.into())
    }

    /// Create an internal error, keeping `message` as client-visible detail
    /// only when `expose_details` is set
    pub fn internal(message: impl Into<String>, expose_details: bool) -> Self {
        let message = message.into();
        let detail = expose_details.then(|| message.clone());
        GatewayError::Internal { message, detail }
    }

    /// HTTP status this error renders with
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Provider(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Internal { .. } | GatewayError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            GatewayError::Validation(msg) => serde_json::json!({ "error": msg }),
            GatewayError::SessionNotFound(_) => serde_json::json!({ "error": "Session not found" }),
            GatewayError::Provider(_) => {
                serde_json::json!({ "error": "Upstream model unavailable" })
            }
            GatewayError::Internal { message, detail } => {
                tracing::error!("[Gateway] Internal error: {}", message);
                match detail {
                    Some(detail) => serde_json::json!({
                        "error": "Internal server error",
                        "details": detail,
                    }),
                    None => serde_json::json!({ "error": "Internal server error" }),
                }
            }
            GatewayError::Config(msg) => {
                tracing::error!("[Gateway] Configuration error at request time: {}", msg);
                serde_json::json!({ "error": "Internal server error" })
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GatewayError::SessionNotFound("abc123".into());
        assert_eq!(err.to_string(), "Session not found: abc123");

        let err = GatewayError::validation("Session ID and message are required");
        assert_eq!(err.to_string(), "Session ID and message are required");
    }

    #[test]
    fn test_provider_error_keeps_context_chain() {
        let err = anyhow::anyhow!("connection refused").context("Failed to send request to Gemini API");
        let provider_err = ProviderError::from(err);
        assert_eq!(
            provider_err.message,
            "Failed to send request to Gemini API: connection refused"
        );
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            GatewayError::validation("missing").into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::SessionNotFound("x".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::internal("boom", false).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_internal_detail_suppressed_in_production() {
        let response = GatewayError::internal("db exploded", false).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Internal server error");
        assert!(json.get("details").is_none());

        let response = GatewayError::internal("db exploded", true).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["details"], "db exploded");
    }
}
