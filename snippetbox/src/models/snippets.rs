//! Snippets

use super::ModelError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// How many snippets the home page lists
pub const LATEST_LIMIT: i64 = 10;

/// A short text that disappears after its expiry time
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Snippet {
    /// Primary key
    pub id: i64,
    /// Title
    pub title: String,
    /// Body text
    pub content: String,
    /// Creation time
    pub created: DateTime<Utc>,
    /// Moment the snippet stops being visible
    pub expires: DateTime<Utc>,
}

impl Snippet {
    /// Creation time for display
    #[must_use]
    pub fn created_display(&self) -> String {
        crate::template::human_date(&self.created)
    }

    /// Expiry time for display
    #[must_use]
    pub fn expires_display(&self) -> String {
        crate::template::human_date(&self.expires)
    }
}

/// Snippet storage. Expired snippets are never returned.
#[async_trait]
pub trait SnippetRepository: Send + Sync + 'static {
    /// Store a snippet that expires `expires_days` from now, returning its id
    async fn insert(&self, title: &str, content: &str, expires_days: i32)
        -> Result<i64, ModelError>;

    /// Fetch a live snippet
    async fn get(&self, id: i64) -> Result<Snippet, ModelError>;

    /// Most recent live snippets, newest first
    async fn latest(&self) -> Result<Vec<Snippet>, ModelError>;
}

/// PostgreSQL snippet repository
#[derive(Debug, Clone)]
pub struct PgSnippetRepository {
    pool: PgPool,
}

impl PgSnippetRepository {
    /// Create a repository over `pool`
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnippetRepository for PgSnippetRepository {
    async fn insert(
        &self,
        title: &str,
        content: &str,
        expires_days: i32,
    ) -> Result<i64, ModelError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO snippets (title, content, created, expires)
             VALUES ($1, $2, now(), now() + make_interval(days => $3))
             RETURNING id",
        )
        .bind(title)
        .bind(content)
        .bind(expires_days)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn get(&self, id: i64) -> Result<Snippet, ModelError> {
        sqlx::query_as::<_, Snippet>(
            "SELECT id, title, content, created, expires FROM snippets
             WHERE expires > now() AND id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ModelError::NoRecord)
    }

    async fn latest(&self) -> Result<Vec<Snippet>, ModelError> {
        let snippets = sqlx::query_as::<_, Snippet>(
            "SELECT id, title, content, created, expires FROM snippets
             WHERE expires > now() ORDER BY id DESC LIMIT $1",
        )
        .bind(LATEST_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(snippets)
    }
}
