//! Chat session
//!
//! A `Session` pairs an opaque identifier and a creation time with the
//! conversation it owns. The conversation sits behind a per-session async
//! mutex that is held for the whole lookup → provider call → append sequence,
//! so two requests on the same session never interleave their turns.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::conversation::Conversation;
use crate::llm::LlmProvider;

/// A server-held conversation thread
pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    conversation: Arc<Mutex<Conversation>>,
}

impl Session {
    /// Create a new session with a fresh identifier
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self::created_at(llm, Utc::now())
    }

    /// Create a new session with an explicit creation time
    pub fn created_at(llm: Arc<dyn LlmProvider>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at,
            conversation: Arc::new(Mutex::new(Conversation::new(llm))),
        }
    }

    /// Get the session ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// When the session was created
    pub fn creation_time(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Age of the session at `now`
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.created_at
    }

    /// Whether the session is older than `ttl` at `now`
    ///
    /// An age exactly equal to the TTL is not yet expired.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now) > ttl
    }

    /// Acquire exclusive access to the conversation
    ///
    /// The guard is owned so it can move into a streaming producer task and
    /// outlive the request handler that acquired it.
    pub async fn lock(&self) -> OwnedMutexGuard<Conversation> {
        self.conversation.clone().lock_owned().await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedProvider;

    fn session_at(created_at: DateTime<Utc>) -> Session {
        Session::created_at(Arc::new(ScriptedProvider::new()), created_at)
    }

    #[test]
    fn test_expiry_boundary() {
        let created = Utc::now();
        let session = session_at(created);
        let ttl = Duration::hours(1);

        assert!(!session.is_expired(created + ttl - Duration::seconds(1), ttl));
        assert!(!session.is_expired(created + ttl, ttl));
        assert!(session.is_expired(created + ttl + Duration::seconds(1), ttl));
    }

    #[test]
    fn test_ids_are_unique() {
        let now = Utc::now();
        let a = session_at(now);
        let b = session_at(now);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.creation_time(), b.creation_time());
    }

    #[tokio::test]
    async fn test_lock_serializes_access() {
        let session = Session::new(Arc::new(ScriptedProvider::new()));

        let mut guard = session.lock().await;
        guard.send_sync("hi").await.unwrap();
        assert!(session.conversation.try_lock().is_err());
        drop(guard);

        assert_eq!(session.lock().await.len(), 2);
    }
}
