//! Router assembly
//!
//! Layering, outermost first:
//! panic recovery, request tracing, security headers, then per-route
//! session, CSRF and authentication on the page routes, with the login
//! guard on the protected subset. `/ping` and `/static` skip the session.

use crate::handlers::{account, health, snippets, users};
use crate::middleware::csrf::{CsrfConfig, CsrfLayer};
use crate::middleware::security::{
    expose_error_detail, make_span, on_request, panic_response, with_security_headers,
};
use crate::middleware::session::SessionLayer;
use crate::middleware::{authenticate, require_authentication};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::any::Any;
use std::path::PathBuf;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, services::ServeDir, trace::TraceLayer};

/// Router options
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Directory served under `/static`
    pub static_dir: PathBuf,
    /// Expose error details in 500 responses
    pub debug: bool,
    /// CSRF cookie settings
    pub csrf: CsrfConfig,
}

/// Build the application router
pub fn router(state: AppState, sessions: SessionLayer, config: &RouterConfig) -> Router {
    let protected = Router::new()
        .route(
            "/snippet/create",
            get(snippets::create).post(snippets::create_post),
        )
        .route("/user/logout", post(users::logout_post))
        .route("/account/view", get(account::view))
        .route(
            "/account/password/update",
            get(account::password_update).post(account::password_update_post),
        )
        .route_layer(middleware::from_fn(require_authentication));

    let dynamic = Router::new()
        .route("/", get(snippets::home))
        .route("/about", get(snippets::about))
        .route("/snippet/view/{id}", get(snippets::view))
        .route("/user/signup", get(users::signup).post(users::signup_post))
        .route("/user/login", get(users::login).post(users::login_post))
        .merge(protected)
        .route_layer(
            ServiceBuilder::new()
                .layer(sessions)
                .layer(CsrfLayer::with_config(config.csrf.clone()))
                .layer(middleware::from_fn_with_state(state.clone(), authenticate)),
        );

    let mut app = Router::new()
        .route("/ping", get(health::ping))
        .nest_service("/static", ServeDir::new(&config.static_dir))
        .merge(dynamic)
        .fallback(health::not_found);

    if config.debug {
        app = app.layer(middleware::from_fn(expose_error_detail));
    }

    let debug = config.debug;
    with_security_headers(app)
        .layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::custom(
                    move |err: Box<dyn Any + Send + 'static>| panic_response(err, debug),
                ))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(make_span)
                        .on_request(on_request),
                ),
        )
        .with_state(state)
}
