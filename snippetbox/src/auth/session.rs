//! Session identifiers and session data
//!
//! A session is a bag of JSON values keyed by string and addressed by an
//! opaque token carried in a cookie. The data lives server-side in a
//! [`SessionStore`](crate::store::SessionStore).

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Session key holding the id of the logged-in user (0 or absent when anonymous)
pub const AUTHENTICATED_USER_ID: &str = "authenticatedUserID";

/// Session key holding a one-shot notice for the next rendered page
pub const FLASH: &str = "flash";

/// Session key holding the path a visitor tried to reach before logging in
pub const REDIRECT_PATH_AFTER_LOGIN: &str = "redirectPathAfterLogin";

/// Number of random bytes in a session token
const TOKEN_BYTES: usize = 32;

/// Session errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Token is not a well-formed session token
    #[error("invalid session token")]
    InvalidToken,

    /// Session store backend failed
    #[error("session store error: {0}")]
    Store(#[from] sqlx::Error),
}

/// Opaque session token
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh random token
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::rng().fill(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Token as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for SessionId {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match URL_SAFE_NO_PAD.decode(s) {
            Ok(bytes) if bytes.len() == TOKEN_BYTES => Ok(Self(s.to_string())),
            _ => Err(SessionError::InvalidToken),
        }
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Values stored for one session plus its absolute deadline
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    /// Session entries
    pub values: HashMap<String, Value>,
    /// Moment after which the session no longer exists
    pub expires_at: DateTime<Utc>,
}

impl SessionData {
    /// Empty session that lives for `lifetime`
    #[must_use]
    pub fn new(lifetime: Duration) -> Self {
        Self {
            values: HashMap::new(),
            expires_at: Utc::now() + lifetime,
        }
    }

    /// Whether the deadline has passed
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Seconds left before the deadline, never negative
    #[must_use]
    pub fn remaining_secs(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds().max(0)
    }

    /// Typed read of an entry
    #[must_use]
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.values
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Insert or replace an entry
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Remove an entry, returning it if present
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Whether no entries are stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique_and_parseable() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 43);
        assert_eq!(SessionId::from_str(a.as_str()).unwrap(), a);
    }

    #[test]
    fn test_malformed_ids_are_rejected() {
        assert!(SessionId::from_str("").is_err());
        assert!(SessionId::from_str("not a token").is_err());
        assert!(SessionId::from_str("c2hvcnQ").is_err());
    }

    #[test]
    fn test_typed_get() {
        let mut data = SessionData::new(Duration::hours(1));
        data.set(AUTHENTICATED_USER_ID, 7_i64);
        data.set(FLASH, "hello");

        assert_eq!(data.get::<i64>(AUTHENTICATED_USER_ID), Some(7));
        assert_eq!(data.get::<String>(FLASH).as_deref(), Some("hello"));
        assert_eq!(data.get::<i64>(FLASH), None);
        assert_eq!(data.get::<String>("missing"), None);
    }

    #[test]
    fn test_expiry() {
        let live = SessionData::new(Duration::hours(1));
        assert!(!live.is_expired());
        assert!(live.remaining_secs() > 3500);

        let dead = SessionData::new(Duration::seconds(-1));
        assert!(dead.is_expired());
        assert_eq!(dead.remaining_secs(), 0);
    }
}
