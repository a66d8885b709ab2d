//! Axum extractors for page handlers
//!
//! Provides the per-request context that every HTML page is rendered with.

mod page;

pub use page::PageContext;
