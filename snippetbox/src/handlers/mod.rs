//! HTTP handlers
//!
//! Page handlers render askama templates through
//! [`RenderPage`](crate::template::RenderPage) and answer form submissions
//! with `303 See Other` redirects.

pub mod account;
pub mod health;
pub mod snippets;
pub mod users;

use crate::error::AppError;
use axum::extract::rejection::FormRejection;
use axum::http::StatusCode;

/// Undecodable form bodies are a client error
pub(crate) fn bad_form(rejection: FormRejection) -> AppError {
    tracing::debug!("Rejected form body: {rejection}");
    AppError::ClientError(StatusCode::BAD_REQUEST)
}
