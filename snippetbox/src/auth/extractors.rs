//! Authentication extractors for Axum handlers
//!
//! # Examples
//!
//! ```rust,no_run
//! use snippetbox::auth::{IsAuthenticated, Session};
//!
//! async fn handler(IsAuthenticated(logged_in): IsAuthenticated, session: Session) -> String {
//!     if logged_in {
//!         format!("token {}", session.token())
//!     } else {
//!         "Hello, guest!".to_string()
//!     }
//! }
//! ```

use super::{AuthContext, Session};
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use std::convert::Infallible;

/// Whether the current request is authenticated
///
/// Reads the [`AuthContext`] left by the `authenticate` middleware. Requests
/// that never passed through it count as anonymous.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IsAuthenticated(pub bool);

impl IsAuthenticated {
    /// Read the flag from request parts
    #[must_use]
    pub fn from_parts(parts: &Parts) -> Self {
        Self(
            parts
                .extensions
                .get::<AuthContext>()
                .is_some_and(|ctx| ctx.is_authenticated),
        )
    }
}

impl<S> FromRequestParts<S> for IsAuthenticated
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

/// Rejection when a handler asks for a session outside the session layer
#[derive(Debug, Clone, Copy)]
pub struct MissingSession;

impl IntoResponse for MissingSession {
    fn into_response(self) -> Response {
        tracing::error!("Session requested on a route without the session layer");
        (StatusCode::INTERNAL_SERVER_ERROR, "Session not initialized").into_response()
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = MissingSession;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Self>().cloned().ok_or(MissingSession)
    }
}
