//! Conversation proxy
//!
//! `Conversation` wraps one external model with the accumulated turn history
//! of a single session and exposes send-and-await and send-and-stream.

mod conversation;
mod message;

pub use conversation::{Conversation, ReplyEvent};
pub use message::{Role, Turn};
