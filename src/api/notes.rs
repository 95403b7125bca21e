//! Notes pages
//!
//! Everything except the home page needs a login; the router in
//! `api::mod` puts those routes behind `require_login`. Notes of other
//! users answer 404 exactly like notes that do not exist.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::get,
    Form, Router,
};

use super::middleware::{found, AppError, AppState, CurrentUser};
use super::views::{insert_form_error, page_context};
use crate::models::NoteInput;
use crate::services::access::Action;
use crate::services::NoteServiceError;

/// Where every successful write lands
const DONE_URL: &str = "/done/";

/// Routes anyone may open
pub fn public_router() -> Router<AppState> {
    Router::new().route("/", get(home))
}

/// Routes that need a logged-in user
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/notes/", get(list))
        .route("/add/", get(add_page).post(add))
        .route("/done/", get(done))
        .route("/note/{slug}/", get(detail))
        .route("/edit/{slug}/", get(edit_page).post(edit))
        .route("/delete/{slug}/", get(delete_page).post(delete))
}

/// GET /
pub async fn home(State(state): State<AppState>, user: CurrentUser) -> Result<Response, AppError> {
    let context = page_context(&user);
    Ok(state.views.render("notes/home.html", &context)?.into_response())
}

/// GET /notes/
pub async fn list(State(state): State<AppState>, user: CurrentUser) -> Result<Response, AppError> {
    let notes = state.note_service.list_for(user.actor()).await?;
    let mut context = page_context(&user);
    context.insert("notes", &notes);
    Ok(state.views.render("notes/list.html", &context)?.into_response())
}

/// GET /done/
pub async fn done(State(state): State<AppState>, user: CurrentUser) -> Result<Response, AppError> {
    let context = page_context(&user);
    Ok(state
        .views
        .render("notes/success.html", &context)?
        .into_response())
}

/// GET /note/{slug}/
pub async fn detail(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    let note = state
        .note_service
        .get(&slug, user.actor(), Action::View)
        .await?;
    let mut context = page_context(&user);
    context.insert("note", &note);
    Ok(state.views.render("notes/detail.html", &context)?.into_response())
}

/// GET /add/
pub async fn add_page(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Response, AppError> {
    render_form(&state, &user, &NoteInput::default(), false, None)
}

/// POST /add/
pub async fn add(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(input): Form<NoteInput>,
) -> Result<Response, AppError> {
    match state.note_service.create(&input, user.actor()).await {
        Ok(_) => Ok(found(DONE_URL)),
        Err(NoteServiceError::Validation { field, message }) => {
            render_form(&state, &user, &input, false, Some((field, &message)))
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /edit/{slug}/
pub async fn edit_page(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    let note = state
        .note_service
        .get(&slug, user.actor(), Action::Edit)
        .await?;
    render_form(&state, &user, &NoteInput::from(&note), true, None)
}

/// POST /edit/{slug}/
pub async fn edit(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(slug): Path<String>,
    Form(input): Form<NoteInput>,
) -> Result<Response, AppError> {
    match state.note_service.update(&slug, &input, user.actor()).await {
        Ok(_) => Ok(found(DONE_URL)),
        Err(NoteServiceError::Validation { field, message }) => {
            render_form(&state, &user, &input, true, Some((field, &message)))
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /delete/{slug}/
pub async fn delete_page(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    let note = state
        .note_service
        .get(&slug, user.actor(), Action::Delete)
        .await?;
    let mut context = page_context(&user);
    context.insert("note", &note);
    Ok(state.views.render("notes/delete.html", &context)?.into_response())
}

/// POST /delete/{slug}/
pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    state.note_service.delete(&slug, user.actor()).await?;
    Ok(found(DONE_URL))
}

fn render_form(
    state: &AppState,
    user: &CurrentUser,
    form: &NoteInput,
    editing: bool,
    error: Option<(&str, &str)>,
) -> Result<Response, AppError> {
    let mut context = page_context(user);
    context.insert("form", form);
    context.insert("editing", &editing);
    if let Some((field, message)) = error {
        insert_form_error(&mut context, field, message);
    }
    Ok(state.views.render("notes/form.html", &context)?.into_response())
}
