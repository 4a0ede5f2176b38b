//! Scripted in-memory provider
//!
//! Replays queued replies instead of calling a model. Used to exercise the
//! gateway end to end without network access. Once the queue is empty it
//! echoes the last user turn.

use anyhow::Result;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::provider::{LlmProvider, TextStream};
use crate::conversation::Turn;

/// One queued provider behaviour
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Complete reply; streamed as a single chunk
    Text(String),
    /// Reply delivered as these chunks; the sync path joins them
    Chunks(Vec<String>),
    /// Fail before anything is produced
    Fail(String),
    /// Stream these chunks, then fail mid-flight
    Interrupt { chunks: Vec<String>, error: String },
}

impl ScriptedReply {
    pub fn text(text: impl Into<String>) -> Self {
        ScriptedReply::Text(text.into())
    }

    pub fn chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScriptedReply::Chunks(chunks.into_iter().map(Into::into).collect())
    }

    pub fn fail(error: impl Into<String>) -> Self {
        ScriptedReply::Fail(error.into())
    }
}

/// Provider that replays a script of replies
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<Vec<Turn>>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider with `replies` queued in order
    pub fn with_replies(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        let provider = Self::new();
        provider
            .replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(replies);
        provider
    }

    /// Queue another reply
    pub fn push(&self, reply: ScriptedReply) {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(reply);
    }

    /// Histories received so far, one entry per call
    pub fn requests(&self) -> Vec<Vec<Turn>> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn next_reply(&self, history: &[Turn]) -> ScriptedReply {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(history.to_vec());

        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| {
                let last = history.last().map(|t| t.text.as_str()).unwrap_or_default();
                ScriptedReply::Text(format!("echo: {}", last))
            })
    }
}

#[async_trait::async_trait]
impl LlmProvider for ScriptedProvider {
    async fn generate(&self, history: &[Turn]) -> Result<String> {
        match self.next_reply(history) {
            ScriptedReply::Text(text) => Ok(text),
            ScriptedReply::Chunks(chunks) => Ok(chunks.concat()),
            ScriptedReply::Fail(error) | ScriptedReply::Interrupt { error, .. } => {
                Err(anyhow::anyhow!(error))
            }
        }
    }

    async fn generate_stream(&self, history: &[Turn]) -> Result<TextStream> {
        let items: Vec<Result<String>> = match self.next_reply(history) {
            ScriptedReply::Text(text) => vec![Ok(text)],
            ScriptedReply::Chunks(chunks) => chunks.into_iter().map(Ok).collect(),
            ScriptedReply::Fail(error) => return Err(anyhow::anyhow!(error)),
            ScriptedReply::Interrupt { chunks, error } => chunks
                .into_iter()
                .map(Ok)
                .chain(std::iter::once(Err(anyhow::anyhow!(error))))
                .collect(),
        };

        Ok(Box::pin(futures::stream::iter(items)))
    }

    fn model(&self) -> String {
        "scripted".to_string()
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }
}
