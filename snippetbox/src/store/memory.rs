//! In-process session store

use super::SessionStore;
use crate::auth::session::{SessionData, SessionError, SessionId};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// Session store backed by a concurrent hash map
///
/// Suitable for development, tests and single-instance deployments. Data is
/// lost on restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    sessions: Arc<DashMap<SessionId, SessionData>>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions currently held, expired ones included
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the store holds no sessions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn find(&self, id: &SessionId) -> Result<Option<SessionData>, SessionError> {
        let found = self.sessions.get(id).map(|entry| entry.value().clone());
        match found {
            Some(data) if data.is_expired() => {
                self.sessions.remove(id);
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn commit(&self, id: &SessionId, data: &SessionData) -> Result<(), SessionError> {
        self.sessions.insert(id.clone(), data.clone());
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<(), SessionError> {
        self.sessions.remove(id);
        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64, SessionError> {
        let before = self.sessions.len();
        self.sessions.retain(|_, data| !data.is_expired());
        Ok(u64::try_from(before.saturating_sub(self.sessions.len())).unwrap_or(u64::MAX))
    }
}
