//! Snippetbox: a server-rendered web application for sharing short text
//! snippets that expire.
//!
//! Visitors browse live snippets; registered users can log in to create
//! snippets and manage their account. Requests carry server-side sessions
//! keyed by a cookie token, state-changing requests are CSRF-protected, and
//! every page is rendered from askama templates.
//!
//! # Layout
//!
//! - [`store`] and [`middleware::session`]: session storage and the session layer
//! - [`middleware::csrf`]: double-submit CSRF protection
//! - [`middleware::auth`]: authentication context and the login guard
//! - [`models`]: user and snippet repositories
//! - [`handlers`]: page handlers wired up in [`routes`]

pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod forms;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;
pub mod state;
pub mod store;
pub mod template;


pub use config::AppConfig;
pub use error::AppError;
pub use state::AppState;
