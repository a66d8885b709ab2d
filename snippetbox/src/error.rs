//! Handler error type
//!
//! Server errors are logged with their full cause chain and answered with a
//! generic 500. The chain is also stashed in the response extensions as
//! [`ErrorDetail`] so debug mode can expose it.

use crate::auth::SessionError;
use crate::models::ModelError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Errors returned by handlers and middleware
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 404 Not Found
    #[error("not found")]
    NotFound,

    /// Any other client error status
    #[error("client error: {0}")]
    ClientError(StatusCode),

    /// Unexpected failure, answered with 500
    #[error(transparent)]
    Server(#[from] anyhow::Error),
}

/// Full cause chain of a server error, attached to the 500 response
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub Arc<str>);

impl AppError {
    /// Wrap any error as a server error
    pub fn server(err: impl Into<anyhow::Error>) -> Self {
        Self::Server(err.into())
    }
}

impl From<ModelError> for AppError {
    fn from(err: ModelError) -> Self {
        Self::server(err)
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        Self::server(err)
    }
}

impl From<askama::Error> for AppError {
    fn from(err: askama::Error) -> Self {
        Self::server(err)
    }
}

/// Plain-text response carrying the status's reason phrase
pub fn client_error(status: StatusCode) -> Response {
    (status, status.canonical_reason().unwrap_or_default()).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound => client_error(StatusCode::NOT_FOUND),
            Self::ClientError(status) => client_error(status),
            Self::Server(err) => {
                let detail = format!("{err:?}");
                tracing::error!(error = %detail, "server error");

                let mut response = client_error(StatusCode::INTERNAL_SERVER_ERROR);
                response.extensions_mut().insert(ErrorDetail(detail.into()));
                response
            }
        }
    }
}
