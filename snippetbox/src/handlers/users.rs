//! Signup, login and logout

use super::bad_form;
use crate::auth::session::{AUTHENTICATED_USER_ID, FLASH, REDIRECT_PATH_AFTER_LOGIN};
use crate::error::AppError;
use crate::extractors::PageContext;
use crate::forms::{UserLoginForm, UserSignupForm};
use crate::models::ModelError;
use crate::state::AppState;
use crate::template::{LoginPage, RenderPage, SignupPage};
use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};

/// Where a fresh login lands when no page asked for it
const DEFAULT_LOGIN_REDIRECT: &str = "/snippet/create";

/// `GET /user/signup`
pub async fn signup(page: PageContext) -> Result<Response, AppError> {
    SignupPage {
        data: page.template_data(),
        form: UserSignupForm::default(),
    }
    .render_page(StatusCode::OK)
}

/// `POST /user/signup`
pub async fn signup_post(
    State(state): State<AppState>,
    page: PageContext,
    form: Result<Form<UserSignupForm>, FormRejection>,
) -> Result<Response, AppError> {
    let Form(mut form) = form.map_err(bad_form)?;

    if !form.check() {
        return SignupPage {
            data: page.template_data(),
            form,
        }
        .render_page(StatusCode::UNPROCESSABLE_ENTITY);
    }

    match state
        .users
        .insert(&form.name, &form.email, &form.password)
        .await
    {
        Ok(()) => {}
        Err(ModelError::DuplicateEmail) => {
            form.errors
                .add_field_error("email", "Email address is already in use");
            return SignupPage {
                data: page.template_data(),
                form,
            }
            .render_page(StatusCode::UNPROCESSABLE_ENTITY);
        }
        Err(err) => return Err(err.into()),
    }

    page.session()
        .put(FLASH, "Your signup was successful. Please log in.");

    Ok(Redirect::to("/user/login").into_response())
}

/// `GET /user/login`
pub async fn login(page: PageContext) -> Result<Response, AppError> {
    LoginPage {
        data: page.template_data(),
        form: UserLoginForm::default(),
    }
    .render_page(StatusCode::OK)
}

/// `POST /user/login`
///
/// Renews the session token before storing the user id, then sends the
/// user to the page that required login, if any.
pub async fn login_post(
    State(state): State<AppState>,
    page: PageContext,
    form: Result<Form<UserLoginForm>, FormRejection>,
) -> Result<Response, AppError> {
    let Form(mut form) = form.map_err(bad_form)?;

    if !form.check() {
        return LoginPage {
            data: page.template_data(),
            form,
        }
        .render_page(StatusCode::UNPROCESSABLE_ENTITY);
    }

    let id = match state.users.authenticate(&form.email, &form.password).await {
        Ok(id) => id,
        Err(ModelError::InvalidCredentials) => {
            form.errors
                .add_non_field_error("Email or password is incorrect");
            return LoginPage {
                data: page.template_data(),
                form,
            }
            .render_page(StatusCode::UNPROCESSABLE_ENTITY);
        }
        Err(err) => return Err(err.into()),
    };

    let session = page.session();
    session.renew_token();
    session.put(AUTHENTICATED_USER_ID, id);

    let target = session.pop_string(REDIRECT_PATH_AFTER_LOGIN);
    if target.is_empty() {
        return Ok(Redirect::to(DEFAULT_LOGIN_REDIRECT).into_response());
    }

    Ok(Redirect::to(&target).into_response())
}

/// `POST /user/logout`
pub async fn logout_post(page: PageContext) -> Result<Response, AppError> {
    let session = page.session();
    session.renew_token();
    session.remove(AUTHENTICATED_USER_ID);
    session.put(FLASH, "You've been logged out successfully!");

    Ok(Redirect::to("/").into_response())
}
