//! Users

use super::ModelError;
use crate::auth::PasswordService;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// Unique constraint on `users.email`
const EMAIL_CONSTRAINT: &str = "users_email_key";

/// A registered user
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Primary key
    pub id: i64,
    /// Display name
    pub name: String,
    /// Lower-cased email address
    pub email: String,
    /// Argon2 PHC string
    pub hashed_password: String,
    /// Signup time
    pub created: DateTime<Utc>,
}

impl User {
    /// Signup date for display
    #[must_use]
    pub fn joined(&self) -> String {
        crate::template::human_date(&self.created)
    }
}

/// User storage
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Register a user; the email is stored lower-cased
    async fn insert(&self, name: &str, email: &str, password: &str) -> Result<(), ModelError>;

    /// Return the id of the user with these credentials
    async fn authenticate(&self, email: &str, password: &str) -> Result<i64, ModelError>;

    /// Whether a user with this id exists
    async fn exists(&self, id: i64) -> Result<bool, ModelError>;

    /// Fetch a user by id
    async fn get(&self, id: i64) -> Result<User, ModelError>;

    /// Replace the password after checking the current one
    async fn password_update(
        &self,
        id: i64,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ModelError>;
}

/// PostgreSQL user repository
#[derive(Debug, Clone)]
pub struct PgUserRepository {
    pool: PgPool,
    passwords: PasswordService,
}

impl PgUserRepository {
    /// Create a repository over `pool`, hashing with `passwords`
    #[must_use]
    pub const fn new(pool: PgPool, passwords: PasswordService) -> Self {
        Self { pool, passwords }
    }
}

fn is_duplicate_email(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.constraint() == Some(EMAIL_CONSTRAINT))
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert(&self, name: &str, email: &str, password: &str) -> Result<(), ModelError> {
        let email = email.to_lowercase();
        let hashed_password = self.passwords.hash(password).await?;

        sqlx::query(
            "INSERT INTO users (name, email, hashed_password, created) VALUES ($1, $2, $3, now())",
        )
        .bind(name)
        .bind(&email)
        .bind(&hashed_password)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            if is_duplicate_email(&err) {
                ModelError::DuplicateEmail
            } else {
                ModelError::Database(err)
            }
        })?;

        Ok(())
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<i64, ModelError> {
        let email = email.to_lowercase();

        let row: Option<(i64, String)> =
            sqlx::query_as("SELECT id, hashed_password FROM users WHERE email = $1")
                .bind(&email)
                .fetch_optional(&self.pool)
                .await?;

        let Some((id, hashed_password)) = row else {
            return Err(ModelError::InvalidCredentials);
        };

        if self.passwords.verify(password, &hashed_password).await? {
            Ok(id)
        } else {
            Err(ModelError::InvalidCredentials)
        }
    }

    async fn exists(&self, id: i64) -> Result<bool, ModelError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT true FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    async fn get(&self, id: i64) -> Result<User, ModelError> {
        sqlx::query_as::<_, User>(
            "SELECT id, name, email, hashed_password, created FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ModelError::NoRecord)
    }

    async fn password_update(
        &self,
        id: i64,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ModelError> {
        let current_hash: String =
            sqlx::query_scalar("SELECT hashed_password FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(ModelError::NoRecord)?;

        if !self.passwords.verify(current_password, &current_hash).await? {
            return Err(ModelError::InvalidCredentials);
        }

        let new_hash = self.passwords.hash(new_password).await?;

        sqlx::query("UPDATE users SET hashed_password = $1 WHERE id = $2")
            .bind(&new_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
