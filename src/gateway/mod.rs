//! HTTP chat gateway
//!
//! Translates the browser client's REST calls into session store and
//! conversation operations:
//!
//! - `GET /health`
//! - `POST /api/chat/start`
//! - `POST /api/chat/message` (JSON reply, or SSE when `stream` is set)
//! - `GET /api/chat/history/:sessionId`
//! - `DELETE /api/chat/:sessionId`

pub mod config;
pub mod fallback;
mod handlers;
pub mod streaming;
pub mod types;

pub use config::GatewayConfig;

use anyhow::Context;
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use std::any::Any;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any as AnyOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::core::{GatewayError, GatewayResult};
use crate::llm::LlmProvider;
use crate::session::{spawn_reaper, SessionStore};

/// Maximum accepted request body
pub const MAX_BODY_SIZE: usize = 65_536;

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SessionStore>,
    pub config: Arc<GatewayConfig>,
}

impl AppState {
    pub fn new(store: Arc<SessionStore>, config: GatewayConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}

/// Build the application router
pub fn build_router(state: AppState) -> GatewayResult<Router> {
    let cors = cors_layer(&state.config)?;
    let expose_details = state.config.expose_error_details();

    Ok(Router::new()
        .route("/health", get(handlers::health))
        .route("/api/chat/start", post(handlers::start_session))
        .route("/api/chat/message", post(handlers::send_message))
        .route("/api/chat/history/:session_id", get(handlers::get_history))
        .route("/api/chat/:session_id", delete(handlers::delete_session))
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(cors)
        .layer(CatchPanicLayer::custom(move |err| {
            panic_response(err, expose_details)
        })))
}

fn cors_layer(config: &GatewayConfig) -> GatewayResult<CorsLayer> {
    let origin = match &config.cors_origin {
        Some(origin) => {
            let value = HeaderValue::from_str(origin).map_err(|e| {
                GatewayError::Config(format!("CLIENT_URL is not a valid origin: {}", e))
            })?;
            AllowOrigin::exact(value)
        }
        None => AllowOrigin::from(AnyOrigin),
    };

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin))
}

fn panic_response(err: Box<dyn Any + Send + 'static>, expose_details: bool) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    GatewayError::internal(format!("Handler panicked: {}", detail), expose_details)
        .into_response()
}

/// Run the gateway until Ctrl-C
///
/// Builds the session store, starts the reaper over it, and serves the
/// router on the configured address.
pub async fn serve(config: GatewayConfig, llm: Arc<dyn LlmProvider>) -> anyhow::Result<()> {
    tracing::info!(
        "[Gateway] Using {} model {}",
        llm.provider_name(),
        llm.model()
    );

    let store = Arc::new(SessionStore::new(llm));
    let reaper = spawn_reaper(
        store.clone(),
        config.session_ttl_chrono(),
        config.session_ttl,
    );

    let addr = config.bind_addr();
    let app = build_router(AppState::new(store, config))?;

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("[Gateway] Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    reaper.abort();
    tracing::info!("[Gateway] Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("[Gateway] Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("[Gateway] Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedProvider;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    fn app_with(config: GatewayConfig) -> Router {
        let store = Arc::new(SessionStore::new(Arc::new(ScriptedProvider::new())));
        build_router(AppState::new(store, config)).unwrap()
    }

    fn app() -> Router {
        app_with(GatewayConfig::default())
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn post_message(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/chat/message")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "OK");
        assert!(json["message"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let response = app()
            .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "Route not found");
    }

    #[tokio::test]
    async fn test_message_validation() {
        let app = app();

        for body in [
            r#"{"message":"hi"}"#,
            r#"{"sessionId":"abc"}"#,
            r#"{"sessionId":"","message":"hi"}"#,
            r#"{"sessionId":"abc","message":""}"#,
            r#"{"sessionId":"abc","message":"   "}"#,
            "not json",
        ] {
            let response = app.clone().oneshot(post_message(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);
            assert_eq!(
                body_json(response).await["error"],
                "Session ID and message are required and must be non-empty"
            );
        }
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let response = app()
            .oneshot(post_message(r#"{"sessionId":"missing","message":"hi"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "Session not found");
    }

    #[tokio::test]
    async fn test_cors_origin() {
        let app = app_with(GatewayConfig::default().with_cors_origin("http://localhost:5173"));
        let response = app
            .oneshot(
                Request::get("/health")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:5173"
        );
    }

    #[test]
    fn test_invalid_cors_origin() {
        let config = GatewayConfig::default().with_cors_origin("bad\norigin");
        assert!(matches!(cors_layer(&config), Err(GatewayError::Config(_))));
    }

    #[tokio::test]
    async fn test_panic_response() {
        let response = panic_response(Box::new("boom"), true);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Internal server error");
        assert!(json["details"].as_str().unwrap().contains("boom"));

        let response = panic_response(Box::new("boom".to_string()), false);
        assert!(body_json(response).await.get("details").is_none());
    }
}
