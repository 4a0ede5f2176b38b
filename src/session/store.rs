//! Process-lifetime session store
//!
//! Constructed once at startup and shared by handle with the gateway and the
//! reaper. Nothing is persisted; a restart discards every session.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::session::Session;
use crate::core::{GatewayError, GatewayResult};
use crate::llm::LlmProvider;

/// Mapping from session identifier to session
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    llm: Arc<dyn LlmProvider>,
}

impl SessionStore {
    /// Create an empty store whose conversations are backed by `llm`
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            llm,
        }
    }

    /// Create a new session and return its identifier
    pub async fn create(&self) -> String {
        self.insert(Session::new(self.llm.clone())).await
    }

    /// Create a session with an explicit creation time
    pub async fn create_at(&self, created_at: DateTime<Utc>) -> String {
        self.insert(Session::created_at(self.llm.clone(), created_at))
            .await
    }

    async fn insert(&self, session: Session) -> String {
        let id = session.id().to_string();
        self.sessions
            .write()
            .await
            .insert(id.clone(), Arc::new(session));
        tracing::info!("[SessionStore] Created session {}", id);
        id
    }

    /// Get a session by ID
    pub async fn get(&self, id: &str) -> GatewayResult<Arc<Session>> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| GatewayError::SessionNotFound(id.to_string()))
    }

    /// Remove a session; returns whether it existed
    pub async fn delete(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            tracing::info!("[SessionStore] Deleted session {}", id);
        }
        removed
    }

    /// Remove every session older than `ttl` at `now`; returns how many
    pub async fn sweep(&self, now: DateTime<Utc>, ttl: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now, ttl));
        before - sessions.len()
    }

    /// Number of live sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
