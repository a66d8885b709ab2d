//! Snippet pages

use super::bad_form;
use crate::auth::session::FLASH;
use crate::error::AppError;
use crate::extractors::PageContext;
use crate::forms::SnippetCreateForm;
use crate::models::ModelError;
use crate::state::AppState;
use crate::template::{AboutPage, CreatePage, HomePage, RenderPage, ViewPage};
use axum::{
    extract::{rejection::FormRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};

/// `GET /`
pub async fn home(State(state): State<AppState>, page: PageContext) -> Result<Response, AppError> {
    let snippets = state.snippets.latest().await?;

    HomePage {
        data: page.template_data(),
        snippets,
    }
    .render_page(StatusCode::OK)
}

/// `GET /about`
pub async fn about(page: PageContext) -> Result<Response, AppError> {
    AboutPage {
        data: page.template_data(),
    }
    .render_page(StatusCode::OK)
}

/// `GET /snippet/view/{id}`
///
/// Ids that are not positive integers, unknown or expired are all 404.
pub async fn view(
    State(state): State<AppState>,
    Path(id): Path<String>,
    page: PageContext,
) -> Result<Response, AppError> {
    let id = match id.parse::<i64>() {
        Ok(id) if id >= 1 => id,
        _ => return Err(AppError::NotFound),
    };

    let snippet = match state.snippets.get(id).await {
        Ok(snippet) => snippet,
        Err(ModelError::NoRecord) => return Err(AppError::NotFound),
        Err(err) => return Err(err.into()),
    };

    ViewPage {
        data: page.template_data(),
        snippet,
    }
    .render_page(StatusCode::OK)
}

/// `GET /snippet/create`
pub async fn create(page: PageContext) -> Result<Response, AppError> {
    CreatePage {
        data: page.template_data(),
        form: SnippetCreateForm::default(),
    }
    .render_page(StatusCode::OK)
}

/// `POST /snippet/create`
pub async fn create_post(
    State(state): State<AppState>,
    page: PageContext,
    form: Result<Form<SnippetCreateForm>, FormRejection>,
) -> Result<Response, AppError> {
    let Form(mut form) = form.map_err(bad_form)?;

    if !form.check() {
        return CreatePage {
            data: page.template_data(),
            form,
        }
        .render_page(StatusCode::UNPROCESSABLE_ENTITY);
    }

    let id = state
        .snippets
        .insert(&form.title, &form.content, form.expires)
        .await?;

    page.session().put(FLASH, "Snippet successfully created!");

    Ok(Redirect::to(&format!("/snippet/view/{id}")).into_response())
}
