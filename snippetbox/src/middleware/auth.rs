//! Authentication middleware
//!
//! [`authenticate`] turns the user id stored in the session into a
//! per-request [`AuthContext`]; [`require_authentication`] guards routes that
//! need a logged-in user.

use crate::auth::session::{AUTHENTICATED_USER_ID, REDIRECT_PATH_AFTER_LOGIN};
use crate::auth::{AuthContext, IsAuthenticated, Session};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{header::CACHE_CONTROL, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

/// Login page that guarded routes redirect to
pub const LOGIN_PATH: &str = "/user/login";

/// Mark the request authenticated when its session names an existing user
///
/// A session without a user id passes through untouched. A user id that no
/// longer exists is ignored but left in the session.
///
/// # Errors
///
/// Returns a server error if the user lookup fails.
pub async fn authenticate(
    State(state): State<AppState>,
    session: Session,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let id = session.get_int(AUTHENTICATED_USER_ID);
    if id == 0 {
        return Ok(next.run(req).await);
    }

    if state.users.exists(id).await? {
        req.extensions_mut().insert(AuthContext {
            is_authenticated: true,
        });
    }

    Ok(next.run(req).await)
}

/// Redirect anonymous requests to the login page
///
/// The requested path is remembered in the session so login can send the
/// user back. Authenticated responses are marked `Cache-Control: no-store`.
pub async fn require_authentication(
    IsAuthenticated(is_authenticated): IsAuthenticated,
    session: Session,
    req: Request,
    next: Next,
) -> Response {
    if !is_authenticated {
        session.put(REDIRECT_PATH_AFTER_LOGIN, req.uri().path());
        return Redirect::to(LOGIN_PATH).into_response();
    }

    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}
