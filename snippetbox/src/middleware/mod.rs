//! Middleware layers for snippetbox
//!
//! Provides middleware for:
//! - Session management (cookie-based, server-side sessions)
//! - CSRF protection
//! - Authentication context and route protection
//! - Security headers, request logging and panic recovery

pub mod auth;
pub mod csrf;
pub mod security;
pub mod session;

pub use auth::{authenticate, require_authentication};
pub use csrf::{CsrfConfig, CsrfLayer, CsrfMiddleware, CsrfToken};
pub use session::{SameSite, SessionConfig, SessionLayer, SessionMiddleware, SESSION_COOKIE_NAME};
