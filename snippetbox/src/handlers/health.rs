//! Liveness probe and fallback

use crate::error::AppError;

/// Liveness probe
pub async fn ping() -> &'static str {
    "OK"
}

/// Fallback for unmatched routes
pub async fn not_found() -> AppError {
    AppError::NotFound
}
