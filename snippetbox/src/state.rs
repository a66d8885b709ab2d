//! Shared application state

use crate::models::{SnippetRepository, UserRepository};
use std::sync::Arc;

/// Handles shared by every handler
#[derive(Clone)]
pub struct AppState {
    /// User storage
    pub users: Arc<dyn UserRepository>,
    /// Snippet storage
    pub snippets: Arc<dyn SnippetRepository>,
}

impl AppState {
    /// Bundle the repositories
    #[must_use]
    pub fn new(users: Arc<dyn UserRepository>, snippets: Arc<dyn SnippetRepository>) -> Self {
        Self { users, snippets }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("users", &"UserRepository")
            .field("snippets", &"SnippetRepository")
            .finish()
    }
}
