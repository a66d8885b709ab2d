//! Password hashing with Argon2id
//!
//! Hashing is deliberately slow, so both hashing and verification run on the
//! blocking thread pool instead of stalling the async workers.

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};

/// Password hashing errors
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Argon2 rejected the parameters or failed to hash
    #[error("password hashing failed: {0}")]
    Hash(String),

    /// Blocking task was cancelled or panicked
    #[error("password hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// One-way password hashing and verification
#[derive(Debug, Clone)]
pub struct PasswordService {
    argon2: Argon2<'static>,
}

impl PasswordService {
    /// Create a service with Argon2 default parameters
    #[must_use]
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    /// Create a service with custom Argon2id parameters
    ///
    /// # Errors
    ///
    /// Returns error if the parameters are out of Argon2's accepted range.
    pub fn with_params(
        memory_cost: u32,
        time_cost: u32,
        parallelism: u32,
    ) -> Result<Self, PasswordError> {
        let params = Params::new(memory_cost, time_cost, parallelism, None)
            .map_err(|e| PasswordError::Hash(e.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a password into a PHC string
    ///
    /// # Errors
    ///
    /// Returns error if hashing fails or the blocking task dies.
    pub async fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let argon2 = self.argon2.clone();
        let password = password.to_owned();

        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            argon2
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| PasswordError::Hash(e.to_string()))
        })
        .await?
    }

    /// Check a password against a stored PHC string
    ///
    /// A malformed stored hash counts as a mismatch.
    ///
    /// # Errors
    ///
    /// Returns error if the blocking task dies.
    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let argon2 = self.argon2.clone();
        let password = password.to_owned();
        let hash = hash.to_owned();

        let valid = tokio::task::spawn_blocking(move || {
            let Ok(parsed) = PasswordHash::new(&hash) else {
                return false;
            };
            argon2.verify_password(password.as_bytes(), &parsed).is_ok()
        })
        .await?;

        Ok(valid)
    }
}

impl Default for PasswordService {
    fn default() -> Self {
        Self::new()
    }
}
