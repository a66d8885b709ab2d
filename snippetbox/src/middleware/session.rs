//! Session middleware for automatic session management
//!
//! Loads the session named by the request cookie before the inner service
//! runs and commits it after the inner service has produced a response. A
//! session that was never modified is not written, and a brand-new session
//! that was never modified sets no cookie. If the inner future is dropped or
//! panics nothing is committed.
//!
//! A renewed session is written under its new token first; the token the
//! request arrived with is deleted only after that commit succeeds.

use crate::auth::session::{SessionData, SessionId};
use crate::auth::{Session, SessionStatus};
use crate::store::SessionStore;
use axum::{
    body::Body,
    extract::Request,
    http::{
        header::{COOKIE, SET_COOKIE},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
};
use std::str::FromStr;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Session cookie name
pub const SESSION_COOKIE_NAME: &str = "session";

/// Session configuration for middleware
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Cookie name for session ID
    pub cookie_name: String,
    /// Cookie path
    pub cookie_path: String,
    /// HTTP-only cookie (recommended: true)
    pub http_only: bool,
    /// Secure cookie (HTTPS only)
    pub secure: bool,
    /// SameSite policy
    pub same_site: SameSite,
    /// Absolute session lifetime in seconds
    pub lifetime_secs: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: SESSION_COOKIE_NAME.to_string(),
            cookie_path: "/".to_string(),
            http_only: true,
            secure: true,
            same_site: SameSite::Lax,
            lifetime_secs: 12 * 60 * 60,
        }
    }
}

/// SameSite cookie policy
#[derive(Clone, Copy, Debug, Default)]
pub enum SameSite {
    /// Strict same-site policy
    Strict,
    /// Lax same-site policy (recommended)
    #[default]
    Lax,
    /// No same-site restriction (requires Secure)
    None,
}

impl SameSite {
    /// Convert to cookie attribute string
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
            Self::None => "None",
        }
    }
}

/// Layer for session middleware
#[derive(Clone)]
pub struct SessionLayer {
    config: Arc<SessionConfig>,
    store: Arc<dyn SessionStore>,
}

impl std::fmt::Debug for SessionLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLayer")
            .field("config", &self.config)
            .field("store", &"SessionStore")
            .finish()
    }
}

impl SessionLayer {
    /// Create session layer with default configuration
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self::with_config(store, SessionConfig::default())
    }

    /// Create session layer with custom configuration
    #[must_use]
    pub fn with_config(store: Arc<dyn SessionStore>, config: SessionConfig) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }
}

impl<S> Layer<S> for SessionLayer {
    type Service = SessionMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionMiddleware {
            inner,
            config: self.config.clone(),
            store: self.store.clone(),
        }
    }
}

/// Session middleware that handles cookie-based sessions
#[derive(Clone)]
pub struct SessionMiddleware<S> {
    inner: S,
    config: Arc<SessionConfig>,
    store: Arc<dyn SessionStore>,
}

impl<S: std::fmt::Debug> std::fmt::Debug for SessionMiddleware<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionMiddleware")
            .field("inner", &self.inner)
            .field("config", &self.config)
            .field("store", &"SessionStore")
            .finish()
    }
}

impl<S> Service<Request> for SessionMiddleware<S>
where
    S: Service<Request, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let config = self.config.clone();
        let store = self.store.clone();
        // Take the instance that was driven to readiness
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let lifetime = chrono::Duration::seconds(config.lifetime_secs);
            let cookie_id = extract_session_id(req.headers(), &config.cookie_name);

            let loaded = match &cookie_id {
                Some(id) => match store.find(id).await {
                    Ok(found) => found.map(|data| (id.clone(), data)),
                    Err(err) => {
                        tracing::error!("Failed to load session: {err}");
                        return Ok(store_failure());
                    }
                },
                None => None,
            };
            let (session_id, session_data) =
                loaded.unwrap_or_else(|| (SessionId::generate(), SessionData::new(lifetime)));

            let session = Session::new(session_id, session_data);
            req.extensions_mut().insert(session.clone());

            let mut response = inner.call(req).await?;

            let (final_id, final_data, status) = session.snapshot();
            if status == SessionStatus::Modified {
                if let Err(err) = store.commit(&final_id, &final_data).await {
                    tracing::error!("Failed to save session: {err}");
                    return Ok(store_failure());
                }
                if let Some(old_id) = session.renewed_from() {
                    if let Err(err) = store.delete(&old_id).await {
                        tracing::error!("Failed to delete renewed session: {err}");
                        return Ok(store_failure());
                    }
                }
                set_session_cookie(&mut response, &final_id, &final_data, &config);
            }

            Ok(response)
        })
    }
}

fn store_failure() -> Response<Body> {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        StatusCode::INTERNAL_SERVER_ERROR
            .canonical_reason()
            .unwrap_or_default(),
    )
        .into_response()
}

/// Find a cookie value by name in the request headers
pub(crate) fn extract_cookie<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(name, _)| name.trim() == cookie_name)
        .map(|(_, value)| value.trim())
}

/// Extract session ID from request cookies
fn extract_session_id(headers: &HeaderMap, cookie_name: &str) -> Option<SessionId> {
    extract_cookie(headers, cookie_name).and_then(|value| SessionId::from_str(value).ok())
}

/// Set session cookie on response
fn set_session_cookie(
    response: &mut Response<Body>,
    session_id: &SessionId,
    data: &SessionData,
    config: &SessionConfig,
) {
    let mut cookie_value = format!(
        "{}={}; Path={}; Max-Age={}; SameSite={}",
        config.cookie_name,
        session_id.as_str(),
        config.cookie_path,
        data.remaining_secs(),
        config.same_site.as_str()
    );

    if config.http_only {
        cookie_value.push_str("; HttpOnly");
    }

    if config.secure {
        cookie_value.push_str("; Secure");
    }

    if let Ok(header_value) = cookie_value.parse() {
        response.headers_mut().append(SET_COOKIE, header_value);
    }
}
