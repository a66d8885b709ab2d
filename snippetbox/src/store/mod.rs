//! Server-side session storage
//!
//! The session middleware loads a session by token before the handler runs
//! and commits it once the handler has produced a response. Stores only need
//! per-token atomicity; all changes made during a request arrive in a single
//! [`SessionStore::commit`] call.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use crate::auth::session::{SessionData, SessionError, SessionId};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Backend holding session data keyed by token
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Load a live session. Expired or unknown tokens yield `None`.
    async fn find(&self, id: &SessionId) -> Result<Option<SessionData>, SessionError>;

    /// Insert or replace the data for a token
    async fn commit(&self, id: &SessionId, data: &SessionData) -> Result<(), SessionError>;

    /// Forget a token
    async fn delete(&self, id: &SessionId) -> Result<(), SessionError>;

    /// Drop every expired session, returning how many were removed
    async fn delete_expired(&self) -> Result<u64, SessionError>;
}

/// Periodically purge expired sessions from `store`
pub fn spawn_cleanup_task(
    store: Arc<dyn SessionStore>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match store.delete_expired().await {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, "Purged expired sessions"),
                Err(err) => tracing::warn!("Session cleanup failed: {err}"),
            }
        }
    })
}
