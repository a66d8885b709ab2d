//! Authentication and session management
//!
//! Session-based authentication with secure HTTP-only cookies. The session
//! middleware hands every request a [`Session`] handle; handlers read and
//! change entries through it and the middleware commits the result once the
//! response is ready.

pub mod extractors;
pub mod password;
pub mod session;

pub use extractors::IsAuthenticated;
pub use password::{PasswordError, PasswordService};
pub use session::{SessionData, SessionError, SessionId};

use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

/// Per-request authentication state
///
/// Inserted into request extensions by the `authenticate` middleware only
/// when the session's user still exists. Never persisted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AuthContext {
    /// Whether the request belongs to a logged-in user
    pub is_authenticated: bool,
}

/// Whether a session needs to be written back to the store
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    /// Nothing changed since load
    Unmodified,
    /// Entries or token changed
    Modified,
}

#[derive(Debug)]
struct SessionState {
    id: SessionId,
    data: SessionData,
    status: SessionStatus,
    renewed_from: Option<SessionId>,
}

/// Request-scoped session handle
///
/// Cloning is cheap and every clone sees the same state, so middleware and
/// handlers observe each other's changes within a request.
#[derive(Clone, Debug)]
pub struct Session {
    state: Arc<Mutex<SessionState>>,
}

impl Session {
    /// Wrap loaded (or fresh) session data
    #[must_use]
    pub fn new(id: SessionId, data: SessionData) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState {
                id,
                data,
                status: SessionStatus::Unmodified,
                renewed_from: None,
            })),
        }
    }

    /// Current token
    #[must_use]
    pub fn token(&self) -> SessionId {
        self.state.lock().id.clone()
    }

    /// Integer entry, 0 when absent or not an integer
    #[must_use]
    pub fn get_int(&self, key: &str) -> i64 {
        self.state.lock().data.get::<i64>(key).unwrap_or(0)
    }

    /// String entry, empty when absent or not a string
    #[must_use]
    pub fn get_string(&self, key: &str) -> String {
        self.state.lock().data.get::<String>(key).unwrap_or_default()
    }

    /// Read a string entry and delete it in the same step
    pub fn pop_string(&self, key: &str) -> String {
        let mut state = self.state.lock();
        match state.data.remove(key) {
            Some(value) => {
                state.status = SessionStatus::Modified;
                match value {
                    Value::String(s) => s,
                    _ => String::new(),
                }
            }
            None => String::new(),
        }
    }

    /// Insert or replace an entry
    pub fn put(&self, key: &str, value: impl Into<Value>) {
        let mut state = self.state.lock();
        state.data.set(key, value);
        state.status = SessionStatus::Modified;
    }

    /// Delete an entry if present
    pub fn remove(&self, key: &str) {
        let mut state = self.state.lock();
        if state.data.remove(key).is_some() {
            state.status = SessionStatus::Modified;
        }
    }

    /// Move the session data to a new token
    ///
    /// The old token stays in the store until the session middleware has
    /// committed the data under the new one, then it is deleted. Call on every
    /// privilege change.
    pub fn renew_token(&self) {
        let mut state = self.state.lock();
        let old = std::mem::replace(&mut state.id, SessionId::generate());
        // Renewing twice still retires the token the request arrived with
        state.renewed_from.get_or_insert(old);
        state.status = SessionStatus::Modified;
    }

    /// Whether the token was renewed during this request
    #[must_use]
    pub fn is_renewed(&self) -> bool {
        self.state.lock().renewed_from.is_some()
    }

    /// Token the request arrived with, if it has since been renewed
    #[must_use]
    pub fn renewed_from(&self) -> Option<SessionId> {
        self.state.lock().renewed_from.clone()
    }

    /// Token, data and status as they stand now
    #[must_use]
    pub fn snapshot(&self) -> (SessionId, SessionData, SessionStatus) {
        let state = self.state.lock();
        (state.id.clone(), state.data.clone(), state.status)
    }
}

#[cfg(test)]
mod tests {
    use super::session::{AUTHENTICATED_USER_ID, FLASH, REDIRECT_PATH_AFTER_LOGIN};
    use super::*;
    use chrono::Duration;

    fn fresh() -> Session {
        Session::new(SessionId::generate(), SessionData::new(Duration::hours(12)))
    }

    #[test]
    fn test_reads_do_not_modify() {
        let session = fresh();

        assert_eq!(session.get_int(AUTHENTICATED_USER_ID), 0);
        assert_eq!(session.get_string(FLASH), "");
        assert_eq!(session.pop_string(FLASH), "");
        session.remove(AUTHENTICATED_USER_ID);

        let (_, _, status) = session.snapshot();
        assert_eq!(status, SessionStatus::Unmodified);
    }

    #[test]
    fn test_pop_is_one_shot() {
        let session = fresh();
        session.put(FLASH, "Saved!");

        assert_eq!(session.pop_string(FLASH), "Saved!");
        assert_eq!(session.pop_string(FLASH), "");

        let (_, data, status) = session.snapshot();
        assert!(data.is_empty());
        assert_eq!(status, SessionStatus::Modified);
    }

    #[test]
    fn test_last_put_wins() {
        let session = fresh();
        session.put(REDIRECT_PATH_AFTER_LOGIN, "/account/view");
        session.put(REDIRECT_PATH_AFTER_LOGIN, "/snippet/create");

        assert_eq!(
            session.get_string(REDIRECT_PATH_AFTER_LOGIN),
            "/snippet/create"
        );
    }

    #[test]
    fn test_renew_keeps_data_and_remembers_old_token() {
        let session = fresh();
        session.put(AUTHENTICATED_USER_ID, 3_i64);
        let old_id = session.token();
        assert!(!session.is_renewed());

        session.renew_token();

        assert_ne!(session.token(), old_id);
        assert!(session.is_renewed());
        assert_eq!(session.renewed_from(), Some(old_id));
        assert_eq!(session.get_int(AUTHENTICATED_USER_ID), 3);
    }

    #[test]
    fn test_second_renew_keeps_original_token() {
        let session = fresh();
        let original = session.token();

        session.renew_token();
        let first = session.token();
        session.renew_token();

        assert_ne!(session.token(), first);
        assert_eq!(session.renewed_from(), Some(original));
    }
}
