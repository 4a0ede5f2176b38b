//! Server-sent event relay
//!
//! A producer task drives the conversation's relay and pushes frames onto a
//! bounded channel; the response body drains that channel. The producer owns
//! the session's conversation guard, so the session stays locked until the
//! reply is committed or discarded, even if the client has gone away.

use axum::body::Body;
use axum::http::{header, Response, StatusCode};
use futures::StreamExt;
use tokio::sync::{mpsc, OwnedMutexGuard};

use super::types::{ChatMessage, SseFrame};
use crate::conversation::{Conversation, ReplyEvent};
use crate::llm::TextStream;

/// Frames buffered between the producer and the response body
pub const RELAY_BUFFER: usize = 32;

/// Client-facing text of an `error` frame when provider detail is hidden
pub const INTERRUPTED_MESSAGE: &str = "The reply was interrupted";

impl SseFrame {
    /// Frame for a relay event; provider failure detail is only passed
    /// through when `expose_details` is set
    pub fn from_event(event: ReplyEvent, expose_details: bool) -> Self {
        match event {
            ReplyEvent::Chunk(content) => SseFrame::Chunk { content },
            ReplyEvent::Complete(turn) => SseFrame::Complete {
                message: ChatMessage::from(&turn),
            },
            ReplyEvent::Failed(error) if expose_details => SseFrame::Error { error },
            ReplyEvent::Failed(_) => SseFrame::Error {
                error: INTERRUPTED_MESSAGE.to_string(),
            },
        }
    }
}

/// Start relaying `upstream` and return the `text/event-stream` response
pub fn relay_response(
    session_id: String,
    mut conversation: OwnedMutexGuard<Conversation>,
    text: String,
    upstream: TextStream,
    expose_details: bool,
) -> Response<Body> {
    let (tx, mut rx) = mpsc::channel::<SseFrame>(RELAY_BUFFER);

    tokio::spawn(async move {
        let events = conversation.relay(&text, upstream);
        futures::pin_mut!(events);

        let mut client_connected = true;
        while let Some(event) = events.next().await {
            match &event {
                ReplyEvent::Complete(turn) => tracing::info!(
                    "[Gateway] Stream for session {} complete ({} chars)",
                    session_id,
                    turn.text.len()
                ),
                ReplyEvent::Failed(error) => tracing::warn!(
                    "[Gateway] Stream for session {} failed: {}",
                    session_id,
                    error
                ),
                ReplyEvent::Chunk(_) => {}
            }

            // A departed client does not stop the relay; the reply is still committed
            let frame = SseFrame::from_event(event, expose_details);
            if client_connected && tx.send(frame).await.is_err() {
                tracing::debug!(
                    "[Gateway] Client left session {} mid-stream, draining upstream",
                    session_id
                );
                client_connected = false;
            }
        }
    });

    let stream = async_stream::stream! {
        while let Some(frame) = rx.recv().await {
            yield Ok::<_, std::convert::Infallible>(frame.to_event());
        }
    };

    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = StatusCode::OK;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("text/event-stream"),
    );
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-cache"),
    );
    response.headers_mut().insert(
        header::CONNECTION,
        header::HeaderValue::from_static("keep-alive"),
    );
    response
}
