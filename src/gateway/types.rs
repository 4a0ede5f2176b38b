//! Wire types for the chat API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conversation::Turn;

/// A message as the browser client sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    /// `"user"` or `"ai"`
    pub sender: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// An `ai` message that is not part of any conversation history
    pub fn ai(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            sender: "ai".to_string(),
            timestamp: Utc::now(),
        }
    }
}

impl From<&Turn> for ChatMessage {
    fn from(turn: &Turn) -> Self {
        Self {
            id: turn.id.clone(),
            text: turn.text.clone(),
            sender: turn.role.sender_tag().to_string(),
            timestamp: turn.timestamp,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub stream: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionResponse {
    pub session_id: String,
    pub message: ChatMessage,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub message: ChatMessage,
    /// Set when the reply is the canned offline fallback
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_offline: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub history: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
}

/// One server-sent event on a streamed reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SseFrame {
    Chunk { content: String },
    Complete { message: ChatMessage },
    Error { error: String },
}

impl SseFrame {
    /// Render as a `data:` line terminated by a blank line
    pub fn to_event(&self) -> String {
        match serde_json::to_string(self) {
            Ok(json) => format!("data: {}\n\n", json),
            Err(e) => {
                tracing::error!("[Gateway] Failed to serialize SSE frame: {}", e);
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_camel_case() {
        let req: SendMessageRequest =
            serde_json::from_str(r#"{"sessionId":"abc","message":"hi","stream":true}"#).unwrap();
        assert_eq!(req.session_id.as_deref(), Some("abc"));
        assert_eq!(req.message.as_deref(), Some("hi"));
        assert_eq!(req.stream, Some(true));

        let req: SendMessageRequest = serde_json::from_str("{}").unwrap();
        assert!(req.session_id.is_none() && req.stream.is_none());
    }

    #[test]
    fn test_offline_flag_only_when_set() {
        let online = serde_json::to_value(MessageResponse {
            message: ChatMessage::ai("hello"),
            is_offline: false,
        })
        .unwrap();
        assert!(online.get("isOffline").is_none());

        let offline = serde_json::to_value(MessageResponse {
            message: ChatMessage::ai("hello"),
            is_offline: true,
        })
        .unwrap();
        assert_eq!(offline["isOffline"], true);
    }

    #[test]
    fn test_sse_frame_shape() {
        let frame = SseFrame::Chunk {
            content: "Hel".to_string(),
        };
        assert_eq!(frame.to_event(), "data: {\"type\":\"chunk\",\"content\":\"Hel\"}\n\n");

        let frame = SseFrame::Error {
            error: "boom".to_string(),
        };
        assert_eq!(frame.to_event(), "data: {\"type\":\"error\",\"error\":\"boom\"}\n\n");
    }

    #[test]
    fn test_message_from_turn() {
        let turn = Turn::assistant("Do 3 sets of 10");
        let message = ChatMessage::from(&turn);
        assert_eq!(message.id, turn.id);
        assert_eq!(message.sender, "ai");
        assert_eq!(message.timestamp, turn.timestamp);
    }
}
