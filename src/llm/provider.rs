//! LLM Provider trait
//!
//! Abstracts the external "generate" capability so the conversation proxy can
//! run against Gemini in production and against scripted providers in tests.

use anyhow::Result;
use futures::stream::Stream;
use std::pin::Pin;

use crate::conversation::Turn;

/// Lazy sequence of text fragments produced by a streaming generation.
///
/// The stream is finite; an `Err` item means the upstream was interrupted
/// and no further items follow.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Trait for LLM providers that can back a conversation.
///
/// `history` is the full conversation so far, oldest first, and always ends
/// with the user turn being answered.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a complete reply and wait for it.
    async fn generate(&self, history: &[Turn]) -> Result<String>;

    /// Open a streaming generation.
    ///
    /// Returning `Ok` means the upstream accepted the request; failures after
    /// that point surface as `Err` items on the stream.
    async fn generate_stream(&self, history: &[Turn]) -> Result<TextStream>;

    /// Get the current model name.
    fn model(&self) -> String;

    /// Get the provider name (e.g., "gemini").
    fn provider_name(&self) -> &str;
}
