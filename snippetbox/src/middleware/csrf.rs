//! CSRF protection middleware
//!
//! Each visitor holds a random base token in an HTTP-only cookie. Pages embed
//! a masked copy of it (`pad || pad XOR token`, fresh pad per render) in a
//! hidden `csrf_token` field. Unsafe requests must echo the token back in
//! that field or in the `X-CSRF-Token` header, otherwise they are answered
//! with `400 Bad Request` and the inner service never runs.
//!
//! When the session token is renewed during a request the base token is
//! rotated as well.

use super::session::{extract_cookie, SameSite};
use crate::auth::Session;
use axum::{
    body::Body,
    extract::{FromRequestParts, Request},
    http::{
        header::{CONTENT_TYPE, SET_COOKIE, VARY},
        request::Parts,
        HeaderValue, Method, StatusCode,
    },
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use std::sync::Arc;
use std::task::{Context, Poll};
use subtle::ConstantTimeEq;
use tower::{Layer, Service};

/// Name of the cookie carrying the base token
pub const CSRF_COOKIE_NAME: &str = "csrf_token";

/// Name of the hidden form field carrying the masked token
pub const CSRF_FORM_FIELD: &str = "csrf_token";

/// Header accepted as an alternative to the form field
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Token length in bytes
const TOKEN_BYTES: usize = 32;

/// CSRF configuration
#[derive(Clone, Debug)]
pub struct CsrfConfig {
    /// Cookie name for the base token
    pub cookie_name: String,
    /// Cookie path
    pub cookie_path: String,
    /// HTTP-only cookie
    pub http_only: bool,
    /// Secure cookie (HTTPS only)
    pub secure: bool,
    /// SameSite policy
    pub same_site: SameSite,
    /// Cookie lifetime in seconds
    pub max_age_secs: u64,
    /// Largest form body read while looking for the token
    pub body_limit: usize,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            cookie_name: CSRF_COOKIE_NAME.to_string(),
            cookie_path: "/".to_string(),
            http_only: true,
            secure: true,
            same_site: SameSite::Lax,
            max_age_secs: 365 * 24 * 60 * 60,
            body_limit: 2 * 1024 * 1024,
        }
    }
}

/// The base token for the current request
///
/// Available to handlers through request extensions. Use
/// [`CsrfToken::masked`] when embedding it in a page.
#[derive(Clone, PartialEq, Eq)]
pub struct CsrfToken([u8; TOKEN_BYTES]);

impl std::fmt::Debug for CsrfToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CsrfToken(..)")
    }
}

impl CsrfToken {
    /// Generate a random token
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::rng().fill(&mut bytes);
        Self(bytes)
    }

    /// Parse the cookie form of a token
    #[must_use]
    pub fn from_cookie(value: &str) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(value).ok()?;
        bytes.try_into().ok().map(Self)
    }

    /// Cookie form of the token
    #[must_use]
    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }

    /// One-time masked form for embedding in pages
    #[must_use]
    pub fn masked(&self) -> String {
        let mut pad = [0u8; TOKEN_BYTES];
        rand::rng().fill(&mut pad);

        let mut out = Vec::with_capacity(TOKEN_BYTES * 2);
        out.extend_from_slice(&pad);
        out.extend(pad.iter().zip(self.0.iter()).map(|(p, t)| p ^ t));
        URL_SAFE_NO_PAD.encode(out)
    }

    /// Check a submitted token, masked or raw, in constant time
    #[must_use]
    pub fn verify(&self, submitted: &str) -> bool {
        let Ok(bytes) = URL_SAFE_NO_PAD.decode(submitted.trim()) else {
            return false;
        };

        let candidate: Vec<u8> = match bytes.len() {
            TOKEN_BYTES => bytes,
            len if len == TOKEN_BYTES * 2 => {
                let (pad, masked) = bytes.split_at(TOKEN_BYTES);
                pad.iter().zip(masked).map(|(p, m)| p ^ m).collect()
            }
            _ => return false,
        };

        self.0[..].ct_eq(&candidate[..]).into()
    }
}

impl<S> FromRequestParts<S> for CsrfToken
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or((StatusCode::INTERNAL_SERVER_ERROR, "CSRF token not initialized"))
    }
}

/// Layer for CSRF middleware
#[derive(Clone, Debug, Default)]
pub struct CsrfLayer {
    config: Arc<CsrfConfig>,
}

impl CsrfLayer {
    /// Create CSRF layer with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create CSRF layer with custom configuration
    #[must_use]
    pub fn with_config(config: CsrfConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl<S> Layer<S> for CsrfLayer {
    type Service = CsrfMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CsrfMiddleware {
            inner,
            config: self.config.clone(),
        }
    }
}

/// CSRF middleware
#[derive(Clone, Debug)]
pub struct CsrfMiddleware<S> {
    inner: S,
    config: Arc<CsrfConfig>,
}

impl<S> Service<Request> for CsrfMiddleware<S>
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

    fn call(&mut self, req: Request) -> Self::Future {
        let config = self.config.clone();
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let existing = extract_cookie(req.headers(), &config.cookie_name)
                .and_then(CsrfToken::from_cookie);
            let issue_cookie = existing.is_none();
            let token = existing.unwrap_or_else(CsrfToken::generate);

            let mut req = if is_safe_method(req.method()) {
                req
            } else {
                let (submitted, req) = submitted_token(req, config.body_limit).await;
                let valid = !issue_cookie && submitted.is_some_and(|value| token.verify(&value));
                if !valid {
                    tracing::warn!(
                        method = %req.method(),
                        path = req.uri().path(),
                        "CSRF token missing or invalid"
                    );
                    return Ok(csrf_failure());
                }
                req
            };

            let session = req.extensions().get::<Session>().cloned();
            req.extensions_mut().insert(token.clone());

            let mut response = inner.call(req).await?;

            let renewed = session.is_some_and(|session| session.is_renewed());
            if renewed {
                set_csrf_cookie(&mut response, &CsrfToken::generate(), &config);
            } else if issue_cookie {
                set_csrf_cookie(&mut response, &token, &config);
            }
            response
                .headers_mut()
                .append(VARY, HeaderValue::from_static("Cookie"));

            Ok(response)
        })
    }
}

const fn is_safe_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

/// Pull the submitted token from the header or the url-encoded form body
///
/// The body is buffered and put back so the handler can still decode it.
async fn submitted_token(req: Request, body_limit: usize) -> (Option<String>, Request) {
    if let Some(value) = req
        .headers()
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok())
    {
        return (Some(value.to_string()), req);
    }

    let is_form = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));
    if !is_form {
        return (None, req);
    }

    let (parts, body) = req.into_parts();
    let Ok(bytes) = axum::body::to_bytes(body, body_limit).await else {
        return (None, Request::from_parts(parts, Body::empty()));
    };

    let submitted = url::form_urlencoded::parse(&bytes)
        .find(|(name, _)| name == CSRF_FORM_FIELD)
        .map(|(_, value)| value.into_owned());

    (submitted, Request::from_parts(parts, Body::from(bytes)))
}

fn csrf_failure() -> Response<Body> {
    (StatusCode::BAD_REQUEST, "Bad Request").into_response()
}

fn set_csrf_cookie(response: &mut Response<Body>, token: &CsrfToken, config: &CsrfConfig) {
    let mut cookie_value = format!(
        "{}={}; Path={}; Max-Age={}; SameSite={}",
        config.cookie_name,
        token.encode(),
        config.cookie_path,
        config.max_age_secs,
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

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;
    use std::convert::Infallible;
    use tower::ServiceExt;

    type Handler = fn(Request) -> std::future::Ready<Result<Response<Body>, Infallible>>;

    fn reached(_req: Request) -> std::future::Ready<Result<Response<Body>, Infallible>> {
        std::future::ready(Ok(Response::new(Body::from("reached"))))
    }

    fn echo() -> CsrfMiddleware<tower::util::ServiceFn<Handler>> {
        CsrfLayer::new().layer(tower::service_fn(reached as Handler))
    }

    fn post(cookie: Option<&CsrfToken>, body: String) -> Request {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/snippet/create")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(token) = cookie {
            builder = builder.header(COOKIE, format!("{CSRF_COOKIE_NAME}={}", token.encode()));
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[test]
    fn test_masked_token_verifies() {
        let token = CsrfToken::generate();
        let first = token.masked();
        let second = token.masked();

        assert_ne!(first, second);
        assert!(token.verify(&first));
        assert!(token.verify(&second));
        assert!(token.verify(&token.encode()));
    }

    #[test]
    fn test_foreign_tokens_fail() {
        let token = CsrfToken::generate();
        let other = CsrfToken::generate();

        assert!(!token.verify(&other.masked()));
        assert!(!token.verify(&other.encode()));
        assert!(!token.verify(""));
        assert!(!token.verify("not base64 at all!"));
    }

    #[test]
    fn test_cookie_round_trip() {
        let token = CsrfToken::generate();
        assert_eq!(CsrfToken::from_cookie(&token.encode()), Some(token));
        assert_eq!(CsrfToken::from_cookie("short"), None);
    }

    #[tokio::test]
    async fn test_get_issues_cookie() {
        let response = echo()
            .oneshot(Request::new(Body::empty()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap();
        assert!(cookie.starts_with("csrf_token="));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
    }

    #[tokio::test]
    async fn test_post_without_token_is_rejected() {
        let token = CsrfToken::generate();
        let response = echo()
            .oneshot(post(Some(&token), "title=x".to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_post_without_cookie_is_rejected() {
        let token = CsrfToken::generate();
        let response = echo()
            .oneshot(post(None, format!("csrf_token={}", token.masked())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_post_with_form_token_passes() {
        let token = CsrfToken::generate();
        let response = echo()
            .oneshot(post(
                Some(&token),
                format!("title=x&csrf_token={}", token.masked()),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_post_with_header_token_passes() {
        let token = CsrfToken::generate();
        let mut request = post(Some(&token), String::new());
        request
            .headers_mut()
            .insert(CSRF_HEADER, HeaderValue::from_str(&token.masked()).unwrap());

        let response = echo().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
