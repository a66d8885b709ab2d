//! PostgreSQL session store

use super::SessionStore;
use crate::auth::session::{SessionData, SessionError, SessionId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{types::Json, PgPool};
use std::collections::HashMap;

/// Session store persisting to the `sessions` table
///
/// Survives restarts and can be shared between instances.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a store on top of an existing pool
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PostgresStore {
    async fn find(&self, id: &SessionId) -> Result<Option<SessionData>, SessionError> {
        let row: Option<(Json<HashMap<String, Value>>, DateTime<Utc>)> = sqlx::query_as(
            "SELECT data, expiry FROM sessions WHERE token = $1 AND expiry > now()",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(Json(values), expires_at)| SessionData { values, expires_at }))
    }

    async fn commit(&self, id: &SessionId, data: &SessionData) -> Result<(), SessionError> {
        sqlx::query(
            "INSERT INTO sessions (token, data, expiry) VALUES ($1, $2, $3)
             ON CONFLICT (token) DO UPDATE SET data = EXCLUDED.data, expiry = EXCLUDED.expiry",
        )
        .bind(id.as_str())
        .bind(Json(&data.values))
        .bind(data.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<(), SessionError> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64, SessionError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expiry <= now()")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
