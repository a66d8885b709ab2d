//! Security headers, request logging and panic recovery

use crate::error::ErrorDetail;
use axum::{
    body::Body,
    extract::{ConnectInfo, Request},
    http::{
        header::{CONNECTION, CONTENT_LENGTH, CONTENT_TYPE},
        HeaderName, HeaderValue, StatusCode,
    },
    middleware::Next,
    response::Response,
    Router,
};
use std::any::Any;
use std::net::SocketAddr;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{info_span, Span};

/// Headers added to every response
pub const SECURITY_HEADERS: [(&str, &str); 5] = [
    (
        "content-security-policy",
        "default-src 'self'; style-src 'self' fonts.googleapis.com; font-src fonts.gstatic.com",
    ),
    ("referrer-policy", "origin-when-cross-origin"),
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "deny"),
    ("x-xss-protection", "0"),
];

/// Add [`SECURITY_HEADERS`] to every response of `router`
pub fn with_security_headers<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    SECURITY_HEADERS
        .into_iter()
        .fold(router, |router, (name, value)| {
            router.layer(SetResponseHeaderLayer::overriding(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            ))
        })
}

/// Span for one request, tagged with the client and request line
pub fn make_span(request: &Request<Body>) -> Span {
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string());

    info_span!(
        "http-request",
        remote_addr = %remote_addr,
        proto = ?request.version(),
        method = %request.method(),
        uri = %request.uri(),
    )
}

/// Log the request line as it arrives
pub fn on_request(request: &Request<Body>, _span: &Span) {
    tracing::info!(
        proto = ?request.version(),
        method = %request.method(),
        uri = %request.uri(),
        "received request"
    );
}

fn panic_message(err: &(dyn Any + Send)) -> &str {
    if let Some(message) = err.downcast_ref::<String>() {
        message.as_str()
    } else if let Some(message) = err.downcast_ref::<&str>() {
        message
    } else {
        "unknown panic"
    }
}

/// 500 response for a panicking handler
///
/// The connection is closed after the response. In debug mode the panic
/// message is returned as the body.
pub fn panic_response(err: Box<dyn Any + Send + 'static>, debug: bool) -> Response {
    let message = panic_message(err.as_ref());
    tracing::error!(panic = %message, "handler panicked");

    let body = if debug {
        message.to_string()
    } else {
        "Internal Server Error".to_string()
    };

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    let headers = response.headers_mut();
    headers.insert(CONNECTION, HeaderValue::from_static("close"));
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// Replace the body of server-error responses with the error's cause chain
///
/// Only installed in debug mode.
pub async fn expose_error_detail(req: Request, next: Next) -> Response {
    let response = next.run(req).await;
    let Some(ErrorDetail(detail)) = response.extensions().get::<ErrorDetail>().cloned() else {
        return response;
    };

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(detail.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use axum::{middleware, routing::get};
    use tower::ServiceExt;

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn failing() -> Router {
        Router::new().route(
            "/",
            get(|| async { Err::<(), _>(AppError::from(anyhow::anyhow!("disk on fire"))) }),
        )
    }

    #[tokio::test]
    async fn test_security_headers_present() {
        let app = with_security_headers(Router::new().route("/", get(|| async { "ok" })));
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        for (name, value) in SECURITY_HEADERS {
            assert_eq!(response.headers().get(name).unwrap(), value);
        }
    }

    #[tokio::test]
    async fn test_error_detail_hidden_by_default() {
        let response = failing()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_string(response).await, "Internal Server Error");
    }

    #[tokio::test]
    async fn test_error_detail_exposed_in_debug() {
        let app = failing().layer(middleware::from_fn(expose_error_detail));
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_string(response).await.contains("disk on fire"));
    }

    #[tokio::test]
    async fn test_panic_response() {
        let response = panic_response(Box::new("boom"), false);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers().get(CONNECTION).unwrap(), "close");
        assert_eq!(body_string(response).await, "Internal Server Error");

        let response = panic_response(Box::new(String::from("boom")), true);
        assert_eq!(body_string(response).await, "boom");
    }
}
