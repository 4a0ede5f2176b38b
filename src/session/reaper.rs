//! Background expiry of idle sessions

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::store::SessionStore;

/// Spawn the periodic sweep over `store`
///
/// Every `interval` the store drops sessions older than `ttl`. The task runs
/// until the returned handle is aborted.
pub fn spawn_reaper(
    store: Arc<SessionStore>,
    ttl: chrono::Duration,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::debug!(
            "[Reaper] Sweeping every {:?}, ttl {}s",
            interval,
            ttl.num_seconds()
        );

        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let removed = store.sweep(Utc::now(), ttl).await;
            if removed > 0 {
                tracing::info!("[Reaper] Removed {} expired session(s)", removed);
            }
        }
    })
}
