//! HTTP handlers for the chat API

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::fallback::fallback_reply;
use super::streaming::relay_response;
use super::types::{
    ChatMessage, DeleteResponse, HealthResponse, HistoryResponse, MessageResponse,
    SendMessageRequest, StartSessionResponse,
};
use super::AppState;
use crate::core::{GatewayError, GatewayResult};
use crate::persona::WELCOME_MESSAGE;

const MISSING_FIELDS: &str = "Session ID and message are required and must be non-empty";

pub(super) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        message: "Fitness coach gateway is running".to_string(),
    })
}

pub(super) async fn start_session(State(state): State<AppState>) -> Json<StartSessionResponse> {
    let session_id = state.store.create().await;

    Json(StartSessionResponse {
        session_id,
        message: ChatMessage::ai(WELCOME_MESSAGE),
    })
}

pub(super) async fn send_message(
    State(state): State<AppState>,
    body: Result<Json<SendMessageRequest>, JsonRejection>,
) -> GatewayResult<Response> {
    let Json(request) = body.map_err(|rejection| {
        tracing::debug!("[Gateway] Rejected message body: {}", rejection.body_text());
        GatewayError::validation(MISSING_FIELDS)
    })?;

    let (session_id, text) = match (request.session_id, request.message) {
        (Some(id), Some(text)) if !id.trim().is_empty() && !text.trim().is_empty() => (id, text),
        _ => return Err(GatewayError::validation(MISSING_FIELDS)),
    };
    let stream = request.stream.unwrap_or(false);

    let session = state.store.get(&session_id).await?;
    // Held until the reply is appended; the streaming path hands it to the producer
    let mut conversation = session.lock().await;

    if stream {
        let opened = conversation.open_stream(&text).await;
        return match opened {
            Ok(upstream) => Ok(relay_response(
                session_id,
                conversation,
                text,
                upstream,
                state.config.expose_error_details(),
            )),
            Err(e) => {
                tracing::warn!(
                    "[Gateway] Could not open stream for session {}: {}",
                    session_id,
                    e
                );
                Ok(offline_reply(&text))
            }
        };
    }

    match conversation.send_sync(&text).await {
        Ok(reply) => Ok(Json(MessageResponse {
            message: ChatMessage::from(&reply),
            is_offline: false,
        })
        .into_response()),
        Err(e) => {
            tracing::warn!("[Gateway] Reply failed for session {}: {}", session_id, e);
            Ok(offline_reply(&text))
        }
    }
}

/// Canned reply flagged as offline; the conversation is left untouched
fn offline_reply(text: &str) -> Response {
    Json(MessageResponse {
        message: ChatMessage::ai(fallback_reply(text)),
        is_offline: true,
    })
    .into_response()
}

pub(super) async fn get_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> GatewayResult<Json<HistoryResponse>> {
    let session = state.store.get(&session_id).await?;
    let conversation = session.lock().await;

    Ok(Json(HistoryResponse {
        history: conversation.history().iter().map(ChatMessage::from).collect(),
    }))
}

pub(super) async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> GatewayResult<Json<DeleteResponse>> {
    if !state.store.delete(&session_id).await {
        return Err(GatewayError::SessionNotFound(session_id));
    }

    Ok(Json(DeleteResponse {
        message: "Session deleted successfully".to_string(),
    }))
}

pub(super) async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Route not found" })),
    )
}
