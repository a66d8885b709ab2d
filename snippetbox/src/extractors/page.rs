//! Page context extractor
//!
//! Gathers what the shared layout needs from the request extensions left by
//! the session, CSRF and authentication middleware.

use crate::auth::extractors::MissingSession;
use crate::auth::session::FLASH;
use crate::auth::{IsAuthenticated, Session};
use crate::middleware::csrf::CsrfToken;
use crate::template::TemplateData;
use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::Datelike;

/// Request context for rendering pages
///
/// Requires the session layer. The CSRF token is optional so the context
/// also works on routes outside the CSRF layer, where forms get an empty
/// token.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(page: PageContext) -> Result<Response, AppError> {
///     AboutPage { data: page.template_data() }.render_page(StatusCode::OK)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct PageContext {
    session: Session,
    csrf_token: Option<CsrfToken>,
    is_authenticated: bool,
}

impl PageContext {
    /// The request's session
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Whether the request is authenticated
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    /// Build the shared template values
    ///
    /// Pops the flash message, so it is shown exactly once.
    #[must_use]
    pub fn template_data(&self) -> TemplateData {
        TemplateData {
            current_year: chrono::Utc::now().year(),
            flash: self.session.pop_string(FLASH),
            is_authenticated: self.is_authenticated,
            csrf_token: self
                .csrf_token
                .as_ref()
                .map(CsrfToken::masked)
                .unwrap_or_default(),
        }
    }
}

impl<S> FromRequestParts<S> for PageContext
where
    S: Send + Sync,
{
    type Rejection = MissingSession;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(MissingSession)?;

        Ok(Self {
            session,
            csrf_token: parts.extensions.get::<CsrfToken>().cloned(),
            is_authenticated: IsAuthenticated::from_parts(parts).0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::{SessionData, SessionId};
    use crate::auth::{AuthContext, SessionStatus};
    use axum::extract::Request;

    fn session() -> Session {
        Session::new(
            SessionId::generate(),
            SessionData::new(chrono::Duration::hours(1)),
        )
    }

    #[tokio::test]
    async fn test_missing_session_is_rejected() {
        let (mut parts, ()) = Request::new(()).into_parts();
        assert!(PageContext::from_request_parts(&mut parts, &())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_template_data_pops_flash() {
        let session = session();
        session.put(FLASH, "Hello");

        let (mut parts, ()) = Request::new(()).into_parts();
        parts.extensions.insert(session.clone());
        parts.extensions.insert(CsrfToken::generate());
        parts.extensions.insert(AuthContext {
            is_authenticated: true,
        });

        let page = PageContext::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        let data = page.template_data();

        assert_eq!(data.flash, "Hello");
        assert!(data.is_authenticated);
        assert!(!data.csrf_token.is_empty());
        assert_eq!(session.get_string(FLASH), "");
        assert_eq!(session.snapshot().2, SessionStatus::Modified);
    }

    #[tokio::test]
    async fn test_no_flash_leaves_session_untouched() {
        let session = session();

        let (mut parts, ()) = Request::new(()).into_parts();
        parts.extensions.insert(session.clone());

        let page = PageContext::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        let data = page.template_data();

        assert!(data.flash.is_empty());
        assert!(!data.is_authenticated);
        assert!(data.csrf_token.is_empty());
        assert_eq!(session.snapshot().2, SessionStatus::Unmodified);
    }
}
