//! Account pages

use super::bad_form;
use crate::auth::session::{AUTHENTICATED_USER_ID, FLASH};
use crate::error::AppError;
use crate::extractors::PageContext;
use crate::forms::AccountPasswordUpdateForm;
use crate::models::ModelError;
use crate::state::AppState;
use crate::template::{AccountPage, PasswordPage, RenderPage};
use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};

/// `GET /account/view`
pub async fn view(State(state): State<AppState>, page: PageContext) -> Result<Response, AppError> {
    let id = page.session().get_int(AUTHENTICATED_USER_ID);

    let user = match state.users.get(id).await {
        Ok(user) => user,
        Err(ModelError::NoRecord) => return Ok(Redirect::to("/user/login").into_response()),
        Err(err) => return Err(err.into()),
    };

    AccountPage {
        data: page.template_data(),
        user,
    }
    .render_page(StatusCode::OK)
}

/// `GET /account/password/update`
pub async fn password_update(page: PageContext) -> Result<Response, AppError> {
    PasswordPage {
        data: page.template_data(),
        form: AccountPasswordUpdateForm::default(),
    }
    .render_page(StatusCode::OK)
}

/// `POST /account/password/update`
pub async fn password_update_post(
    State(state): State<AppState>,
    page: PageContext,
    form: Result<Form<AccountPasswordUpdateForm>, FormRejection>,
) -> Result<Response, AppError> {
    let Form(mut form) = form.map_err(bad_form)?;

    if !form.check() {
        return PasswordPage {
            data: page.template_data(),
            form,
        }
        .render_page(StatusCode::UNPROCESSABLE_ENTITY);
    }

    let id = page.session().get_int(AUTHENTICATED_USER_ID);

    match state
        .users
        .password_update(id, &form.current_password, &form.new_password)
        .await
    {
        Ok(()) => {}
        Err(ModelError::InvalidCredentials) => {
            form.errors
                .add_field_error("current_password", "Current password is incorrect");
            return PasswordPage {
                data: page.template_data(),
                form,
            }
            .render_page(StatusCode::UNPROCESSABLE_ENTITY);
        }
        Err(err) => return Err(err.into()),
    }

    page.session().put(FLASH, "Password successfully changed!");

    Ok(Redirect::to("/account/view").into_response())
}
