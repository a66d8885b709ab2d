//! Data models and their repositories
//!
//! Handlers talk to storage only through [`UserRepository`] and
//! [`SnippetRepository`]; the PostgreSQL implementations live next to the
//! traits.

pub mod snippets;
pub mod users;

#[cfg(test)]
pub mod mock;

pub use snippets::{PgSnippetRepository, Snippet, SnippetRepository};
pub use users::{PgUserRepository, User, UserRepository};

use crate::auth::PasswordError;

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// No live row matched
    #[error("models: no matching record found")]
    NoRecord,

    /// Unknown email or wrong password
    #[error("models: invalid credentials")]
    InvalidCredentials,

    /// Email address already registered
    #[error("models: duplicate email")]
    DuplicateEmail,

    /// Database failure
    #[error("models: database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Password hashing failure
    #[error("models: {0}")]
    Password(#[from] PasswordError),
}
