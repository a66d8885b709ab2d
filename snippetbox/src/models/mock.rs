//! In-memory repositories for handler tests

use super::{ModelError, Snippet, SnippetRepository, User, UserRepository};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Seeded user's email
pub const ALICE_EMAIL: &str = "alice@example.com";
/// Seeded user's password
pub const ALICE_PASSWORD: &str = "pa$$word123";

/// Users kept in memory with plaintext passwords
#[derive(Debug)]
pub struct MockUsers {
    users: Mutex<Vec<User>>,
    exists_calls: AtomicUsize,
    fail_exists: AtomicBool,
    fail_password_update: AtomicBool,
}

impl Default for MockUsers {
    fn default() -> Self {
        Self::new()
    }
}

impl MockUsers {
    /// One user, Alice, with id 1
    pub fn new() -> Self {
        Self {
            users: Mutex::new(vec![User {
                id: 1,
                name: "Alice".to_string(),
                email: ALICE_EMAIL.to_string(),
                hashed_password: ALICE_PASSWORD.to_string(),
                created: Utc::now(),
            }]),
            exists_calls: AtomicUsize::new(0),
            fail_exists: AtomicBool::new(false),
            fail_password_update: AtomicBool::new(false),
        }
    }

    /// Make every later `exists` call fail with a database error
    pub fn fail_exists(&self) {
        self.fail_exists.store(true, Ordering::SeqCst);
    }

    /// Make every later `password_update` call fail with a database error
    pub fn fail_password_update(&self) {
        self.fail_password_update.store(true, Ordering::SeqCst);
    }

    /// How many times `exists` ran
    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    /// Drop a user, as if deleted by another process
    pub fn delete(&self, id: i64) {
        self.users.lock().retain(|user| user.id != id);
    }

    /// Stored password of a user
    pub fn password_of(&self, id: i64) -> Option<String> {
        self.users
            .lock()
            .iter()
            .find(|user| user.id == id)
            .map(|user| user.hashed_password.clone())
    }

    /// Number of stored users
    pub fn count(&self) -> usize {
        self.users.lock().len()
    }
}

#[async_trait]
impl UserRepository for MockUsers {
    async fn insert(&self, name: &str, email: &str, password: &str) -> Result<(), ModelError> {
        let email = email.to_lowercase();
        let mut users = self.users.lock();
        if users.iter().any(|user| user.email == email) {
            return Err(ModelError::DuplicateEmail);
        }
        let id = users.iter().map(|user| user.id).max().unwrap_or(0) + 1;
        users.push(User {
            id,
            name: name.to_string(),
            email,
            hashed_password: password.to_string(),
            created: Utc::now(),
        });
        Ok(())
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<i64, ModelError> {
        let email = email.to_lowercase();
        self.users
            .lock()
            .iter()
            .find(|user| user.email == email && user.hashed_password == password)
            .map(|user| user.id)
            .ok_or(ModelError::InvalidCredentials)
    }

    async fn exists(&self, id: i64) -> Result<bool, ModelError> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_exists.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self.users.lock().iter().any(|user| user.id == id))
    }

    async fn get(&self, id: i64) -> Result<User, ModelError> {
        self.users
            .lock()
            .iter()
            .find(|user| user.id == id)
            .cloned()
            .ok_or(ModelError::NoRecord)
    }

    async fn password_update(
        &self,
        id: i64,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ModelError> {
        if self.fail_password_update.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let mut users = self.users.lock();
        let user = users
            .iter_mut()
            .find(|user| user.id == id)
            .ok_or(ModelError::NoRecord)?;
        if user.hashed_password != current_password {
            return Err(ModelError::InvalidCredentials);
        }
        user.hashed_password = new_password.to_string();
        Ok(())
    }
}

fn unavailable() -> ModelError {
    ModelError::Database(sqlx::Error::PoolTimedOut)
}

/// Snippets kept in memory
#[derive(Debug)]
pub struct MockSnippets {
    snippets: Mutex<Vec<Snippet>>,
    insert_calls: AtomicUsize,
}

impl Default for MockSnippets {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSnippets {
    /// One live snippet with id 1
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            snippets: Mutex::new(vec![Snippet {
                id: 1,
                title: "An old silent pond".to_string(),
                content: "An old silent pond...".to_string(),
                created: now,
                expires: now + Duration::days(365),
            }]),
            insert_calls: AtomicUsize::new(0),
        }
    }

    /// Store a snippet as is, expired or not
    pub fn push(&self, snippet: Snippet) {
        self.snippets.lock().push(snippet);
    }

    /// How many times `insert` ran
    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnippetRepository for MockSnippets {
    async fn insert(
        &self,
        title: &str,
        content: &str,
        expires_days: i32,
    ) -> Result<i64, ModelError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        let mut snippets = self.snippets.lock();
        let id = snippets.iter().map(|s| s.id).max().unwrap_or(0) + 1;
        let now = Utc::now();
        snippets.push(Snippet {
            id,
            title: title.to_string(),
            content: content.to_string(),
            created: now,
            expires: now + Duration::days(i64::from(expires_days)),
        });
        Ok(id)
    }

    async fn get(&self, id: i64) -> Result<Snippet, ModelError> {
        let now = Utc::now();
        self.snippets
            .lock()
            .iter()
            .find(|s| s.id == id && s.expires > now)
            .cloned()
            .ok_or(ModelError::NoRecord)
    }

    async fn latest(&self) -> Result<Vec<Snippet>, ModelError> {
        let now = Utc::now();
        let mut live: Vec<Snippet> = self
            .snippets
            .lock()
            .iter()
            .filter(|s| s.expires > now)
            .cloned()
            .collect();
        live.sort_by(|a, b| b.id.cmp(&a.id));
        live.truncate(10);
        Ok(live)
    }
}
