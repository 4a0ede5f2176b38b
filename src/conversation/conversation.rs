use futures::stream::Stream;
use futures::StreamExt;
use std::sync::Arc;

use super::message::Turn;
use crate::core::ProviderError;
use crate::llm::{LlmProvider, TextStream};

/// Events produced while relaying a streamed reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyEvent {
    /// Incremental text fragment, forwarded as it arrives
    Chunk(String),

    /// Stream finished; the assistant turn has been appended to history
    Complete(Turn),

    /// Upstream failed mid-flight; partial text was discarded
    Failed(String),
}

impl ReplyEvent {
    /// Check if this is a terminal event
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReplyEvent::Complete(_) | ReplyEvent::Failed(_))
    }
}

/// A multi-turn conversation with an external model
///
/// Holds the accumulated turns of one session and forwards them, in full, to
/// the provider on every call. User turns are committed together with the
/// reply they produced, so a failed call leaves the history untouched.
pub struct Conversation {
    llm: Arc<dyn LlmProvider>,
    turns: Vec<Turn>,
}

impl Conversation {
    /// Create an empty conversation backed by `llm`
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            turns: Vec::new(),
        }
    }

    /// Get the conversation history
    pub fn history(&self) -> &[Turn] {
        &self.turns
    }

    /// Number of turns so far
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// History plus the pending user turn, as sent to the provider
    fn request_history(&self, user_turn: &Turn) -> Vec<Turn> {
        let mut history = Vec::with_capacity(self.turns.len() + 1);
        history.extend_from_slice(&self.turns);
        history.push(user_turn.clone());
        history
    }

    fn commit(&mut self, user_turn: Turn, reply: Turn) {
        self.turns.push(user_turn);
        self.turns.push(reply);
    }

    /// Send `text` and wait for the complete reply
    ///
    /// On success both the user turn and the assistant turn are appended and
    /// the assistant turn is returned.
    pub async fn send_sync(&mut self, text: &str) -> Result<Turn, ProviderError> {
        let user_turn = Turn::user(text);
        let history = self.request_history(&user_turn);

        tracing::debug!(
            "[Conversation] Calling {} with {} turns",
            self.llm.provider_name(),
            history.len()
        );

        let reply = self.llm.generate(&history).await?;
        let reply = Turn::assistant(reply);

        self.commit(user_turn, reply.clone());
        Ok(reply)
    }

    /// Open a streamed reply for `text`
    ///
    /// Nothing is recorded yet; pass the returned upstream to [`relay`].
    /// An error here means no response bytes need to have been produced.
    ///
    /// [`relay`]: Conversation::relay
    pub async fn open_stream(&self, text: &str) -> Result<TextStream, ProviderError> {
        let history = self.request_history(&Turn::user(text));

        tracing::debug!(
            "[Conversation] Opening {} stream with {} turns",
            self.llm.provider_name(),
            history.len()
        );

        Ok(self.llm.generate_stream(&history).await?)
    }

    /// Drive an opened upstream to completion
    ///
    /// Yields a `Chunk` per fragment, then exactly one terminal event. On
    /// `Complete` the user turn and the concatenated reply have been appended;
    /// on `Failed` the partial text is dropped and history is unchanged.
    pub fn relay<'a>(
        &'a mut self,
        text: &str,
        mut upstream: TextStream,
    ) -> impl Stream<Item = ReplyEvent> + Send + 'a {
        let user_turn = Turn::user(text);

        async_stream::stream! {
            let mut full_text = String::new();

            while let Some(item) = upstream.next().await {
                match item {
                    Ok(fragment) => {
                        full_text.push_str(&fragment);
                        yield ReplyEvent::Chunk(fragment);
                    }
                    Err(e) => {
                        tracing::warn!(
                            "[Conversation] Stream interrupted after {} bytes: {:#}",
                            full_text.len(),
                            e
                        );
                        yield ReplyEvent::Failed(ProviderError::from(e).message);
                        return;
                    }
                }
            }

            let reply = Turn::assistant(full_text);
            self.commit(user_turn, reply.clone());
            yield ReplyEvent::Complete(reply);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ScriptedProvider, ScriptedReply};

    #[tokio::test]
    async fn test_send_sync_appends_two_turns_per_call() {
        let llm = Arc::new(ScriptedProvider::new());
        let mut conversation = Conversation::new(llm.clone());

        for i in 0..3 {
            let reply = conversation.send_sync(&format!("msg {}", i)).await.unwrap();
            assert_eq!(reply.text, format!("echo: msg {}", i));
        }

        assert_eq!(conversation.len(), 6);
        let history = conversation.history();
        assert!(history[0].is_user());
        assert_eq!(history[4].text, "msg 2");
        assert_eq!(history[5].text, "echo: msg 2");

        // Provider always sees prior history plus the pending user turn
        let sent: Vec<usize> = llm.requests().iter().map(Vec::len).collect();
        assert_eq!(sent, vec![1, 3, 5]);
    }

    #[tokio::test]
    async fn test_send_sync_failure_leaves_history_untouched() {
        let llm = Arc::new(ScriptedProvider::with_replies([ScriptedReply::fail(
            "quota exceeded",
        )]));
        let mut conversation = Conversation::new(llm);

        let err = conversation.send_sync("hello").await.unwrap_err();
        assert!(err.message.contains("quota exceeded"));
        assert!(conversation.is_empty());

        // Next call succeeds and does not see the failed exchange
        conversation.send_sync("again").await.unwrap();
        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation.history()[0].text, "again");
    }

    #[tokio::test]
    async fn test_open_stream_failure_is_reported_before_relay() {
        let llm = Arc::new(ScriptedProvider::with_replies([ScriptedReply::fail("503")]));
        let conversation = Conversation::new(llm);
        assert!(conversation.open_stream("hi").await.is_err());
        assert!(conversation.is_empty());
    }

    #[tokio::test]
    async fn test_relay_commits_full_text() {
        let llm = Arc::new(ScriptedProvider::with_replies([ScriptedReply::chunks([
            "one ", "two",
        ])]));
        let mut conversation = Conversation::new(llm);

        let upstream = conversation.open_stream("count").await.unwrap();
        let events: Vec<ReplyEvent> = conversation.relay("count", upstream).collect().await;

        assert_eq!(events.len(), 3);
        assert_eq!(events[0], ReplyEvent::Chunk("one ".into()));
        assert_eq!(events[1], ReplyEvent::Chunk("two".into()));
        match &events[2] {
            ReplyEvent::Complete(turn) => assert_eq!(turn.text, "one two"),
            other => panic!("expected Complete, got {:?}", other),
        }
        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation.history()[0].text, "count");
        assert_eq!(conversation.history()[1].text, "one two");
    }

    #[tokio::test]
    async fn test_relay_discards_partial_text_on_failure() {
        let llm = Arc::new(ScriptedProvider::with_replies([ScriptedReply::Interrupt {
            chunks: vec!["par".into()],
            error: "connection reset".into(),
        }]));
        let mut conversation = Conversation::new(llm);

        let upstream = conversation.open_stream("count").await.unwrap();
        let events: Vec<ReplyEvent> = conversation.relay("count", upstream).collect().await;

        assert_eq!(events.len(), 2);
        assert_eq!(events[0], ReplyEvent::Chunk("par".into()));
        assert!(matches!(&events[1], ReplyEvent::Failed(msg) if msg.contains("connection reset")));
        assert!(events[1].is_terminal());
        assert!(conversation.is_empty());
    }
}
