//! News pages and comments

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::get,
    Form, Router,
};

use super::middleware::{found, AppError, AppState, CurrentUser};
use super::views::{insert_form_error, page_context};
use crate::models::{Comment, CommentInput};
use crate::services::access::Action;
use crate::services::CommentServiceError;

/// Routes anyone may open
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/news/", get(home))
        .route("/news/{id}/", get(detail))
}

/// Routes that need a logged-in user
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/news/{id}/", axum::routing::post(comment))
        .route(
            "/news/edit_comment/{id}/",
            get(edit_comment_page).post(edit_comment),
        )
        .route(
            "/news/delete_comment/{id}/",
            get(delete_comment_page)
                .post(delete_comment)
                .delete(delete_comment),
        )
}

/// Ids come in as text so that `/news/abc/` is a plain 404
fn parse_id(raw: &str) -> Result<i64, AppError> {
    raw.parse().map_err(|_| AppError::NotFound)
}

fn comments_url(news_id: i64) -> String {
    format!("/news/{}/#comments", news_id)
}

/// GET /news/
pub async fn home(State(state): State<AppState>, user: CurrentUser) -> Result<Response, AppError> {
    let news = state.news_service.home().await?;
    let mut context = page_context(&user);
    context.insert("news", &news);
    Ok(state.views.render("news/home.html", &context)?.into_response())
}

/// GET /news/{id}/
pub async fn detail(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    render_detail(&state, &user, parse_id(&id)?, None, None).await
}

/// POST /news/{id}/
pub async fn comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Form(input): Form<CommentInput>,
) -> Result<Response, AppError> {
    let news_id = parse_id(&id)?;
    match state
        .comment_service
        .create(news_id, &input, user.actor())
        .await
    {
        Ok(_) => Ok(found(&comments_url(news_id))),
        Err(CommentServiceError::Validation { field, message }) => {
            render_detail(&state, &user, news_id, Some(&input), Some((field, &message))).await
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /news/edit_comment/{id}/
pub async fn edit_comment_page(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let comment = state
        .comment_service
        .get_for_owner(parse_id(&id)?, user.actor(), Action::Edit)
        .await?;
    let form = CommentInput {
        text: comment.text.clone(),
    };
    render_edit(&state, &user, &comment, &form, None).await
}

/// POST /news/edit_comment/{id}/
pub async fn edit_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Form(input): Form<CommentInput>,
) -> Result<Response, AppError> {
    let id = parse_id(&id)?;
    match state.comment_service.update(id, &input, user.actor()).await {
        Ok(comment) => Ok(found(&comments_url(comment.news_id))),
        Err(CommentServiceError::Validation { field, message }) => {
            // Ownership was settled before validation ran
            let comment = state
                .comment_service
                .get_for_owner(id, user.actor(), Action::Edit)
                .await?;
            render_edit(&state, &user, &comment, &input, Some((field, &message))).await
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /news/delete_comment/{id}/
pub async fn delete_comment_page(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let comment = state
        .comment_service
        .get_for_owner(parse_id(&id)?, user.actor(), Action::Delete)
        .await?;
    let news = state.news_service.get(comment.news_id).await?;

    let mut context = page_context(&user);
    context.insert("news", &news);
    context.insert("comment", &comment);
    Ok(state.views.render("news/delete.html", &context)?.into_response())
}

/// POST or DELETE /news/delete_comment/{id}/
pub async fn delete_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let comment = state
        .comment_service
        .delete(parse_id(&id)?, user.actor())
        .await?;
    Ok(found(&comments_url(comment.news_id)))
}

async fn render_detail(
    state: &AppState,
    user: &CurrentUser,
    news_id: i64,
    form: Option<&CommentInput>,
    error: Option<(&str, &str)>,
) -> Result<Response, AppError> {
    let news = state.news_service.get(news_id).await?;
    let comments = state.comment_service.list_for_news(news_id).await?;

    let mut context = page_context(user);
    context.insert("news", &news);
    context.insert("comments", &comments);
    if let Some(form) = form {
        context.insert("form", form);
    }
    if let Some((field, message)) = error {
        insert_form_error(&mut context, field, message);
    }
    Ok(state.views.render("news/detail.html", &context)?.into_response())
}

async fn render_edit(
    state: &AppState,
    user: &CurrentUser,
    comment: &Comment,
    form: &CommentInput,
    error: Option<(&str, &str)>,
) -> Result<Response, AppError> {
    let news = state.news_service.get(comment.news_id).await?;

    let mut context = page_context(user);
    context.insert("news", &news);
    context.insert("form", form);
    if let Some((field, message)) = error {
        insert_form_error(&mut context, field, message);
    }
    Ok(state.views.render("news/edit.html", &context)?.into_response())
}
