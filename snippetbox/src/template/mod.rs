//! Askama page templates
//!
//! Every page embeds [`TemplateData`], the values the shared layout needs:
//! the flash message, the login state and the masked CSRF token.
//!
//! # Examples
//!
//! ```rust,no_run
//! use axum::{http::StatusCode, response::Response};
//! use snippetbox::error::AppError;
//! use snippetbox::extractors::PageContext;
//! use snippetbox::template::{AboutPage, RenderPage};
//!
//! async fn about(page: PageContext) -> Result<Response, AppError> {
//!     AboutPage { data: page.template_data() }.render_page(StatusCode::OK)
//! }
//! ```

use crate::error::AppError;
use crate::forms::{AccountPasswordUpdateForm, SnippetCreateForm, UserLoginForm, UserSignupForm};
use crate::models::{Snippet, User};
use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use chrono::{DateTime, Utc};

/// Values shared by every page
#[derive(Debug, Clone, Default)]
pub struct TemplateData {
    /// Year shown in the footer
    pub current_year: i32,
    /// One-shot message, empty when there is none
    pub flash: String,
    /// Whether the visitor is logged in
    pub is_authenticated: bool,
    /// Masked CSRF token for hidden form fields
    pub csrf_token: String,
}

/// Format a timestamp as `02 Jan 2006 at 15:04` in UTC
///
/// The zero timestamp renders as an empty string.
#[must_use]
pub fn human_date(t: &DateTime<Utc>) -> String {
    if t.timestamp() == 0 {
        return String::new();
    }
    t.format("%d %b %Y at %H:%M").to_string()
}

/// Render a template into a full HTML response
pub trait RenderPage: Template {
    /// Render with `status`, turning template failures into server errors
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Server`] if rendering fails.
    fn render_page(&self, status: StatusCode) -> Result<Response, AppError> {
        let html = self.render()?;
        Ok((status, Html(html)).into_response())
    }
}

impl<T: Template> RenderPage for T {}

/// Home page listing the latest snippets
#[derive(Template)]
#[template(path = "home.html")]
pub struct HomePage {
    /// Shared values
    pub data: TemplateData,
    /// Latest live snippets
    pub snippets: Vec<Snippet>,
}

/// About page
#[derive(Template)]
#[template(path = "about.html")]
pub struct AboutPage {
    /// Shared values
    pub data: TemplateData,
}

/// A single snippet
#[derive(Template)]
#[template(path = "view.html")]
pub struct ViewPage {
    /// Shared values
    pub data: TemplateData,
    /// The snippet on display
    pub snippet: Snippet,
}

/// New snippet form
#[derive(Template)]
#[template(path = "create.html")]
pub struct CreatePage {
    /// Shared values
    pub data: TemplateData,
    /// Submitted or default values
    pub form: SnippetCreateForm,
}

/// Signup form
#[derive(Template)]
#[template(path = "signup.html")]
pub struct SignupPage {
    /// Shared values
    pub data: TemplateData,
    /// Submitted values
    pub form: UserSignupForm,
}

/// Login form
#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginPage {
    /// Shared values
    pub data: TemplateData,
    /// Submitted values
    pub form: UserLoginForm,
}

/// Account details
#[derive(Template)]
#[template(path = "account.html")]
pub struct AccountPage {
    /// Shared values
    pub data: TemplateData,
    /// Logged-in user
    pub user: User,
}

/// Password change form
#[derive(Template)]
#[template(path = "password.html")]
pub struct PasswordPage {
    /// Shared values
    pub data: TemplateData,
    /// Submitted values
    pub form: AccountPasswordUpdateForm,
}
