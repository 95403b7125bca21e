//! HTTP layer - page handlers and routing
//!
//! - `notes`: private notes (`/`, `/notes/`, `/add/`, `/note/{slug}/`, ...)
//! - `news`: public news with comments (`/news/...`)
//! - `auth`: login, logout and signup (`/auth/...`)

pub mod auth;
pub mod middleware;
pub mod news;
pub mod notes;
pub mod views;

use axum::{middleware as axum_middleware, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::repositories::{
    SqlxCommentRepository, SqlxNewsRepository, SqlxNoteRepository, SqlxSessionRepository,
    SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::services::{CommentService, ModerationFilter, NewsService, NoteService, UserService};

pub use middleware::{AppError, AppState, CurrentUser};
pub use views::Views;

/// Wire repositories, services and templates into the shared state.
///
/// # Errors
///
/// Fails when the banned-word list does not compile or a template does
/// not parse.
pub fn build_state(pool: DynDatabasePool, config: &Config) -> anyhow::Result<AppState> {
    let moderation = ModerationFilter::from_config(&config.moderation)?;
    let news_repo = SqlxNewsRepository::boxed(pool.clone());

    Ok(AppState {
        user_service: Arc::new(UserService::with_session_ttl(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
            config.session.ttl_days,
        )),
        note_service: Arc::new(NoteService::new(SqlxNoteRepository::boxed(pool.clone()))),
        news_service: Arc::new(NewsService::new(
            news_repo.clone(),
            config.news.home_page_count,
        )),
        comment_service: Arc::new(CommentService::new(
            SqlxCommentRepository::boxed(pool.clone()),
            news_repo,
            moderation,
        )),
        views: Arc::new(Views::load()?),
    })
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    // Anonymous users are bounced to the login page before any handler runs
    let protected_routes = Router::new()
        .merge(notes::protected_router())
        .merge(news::protected_router())
        .route_layer(axum_middleware::from_fn(middleware::require_login));

    Router::new()
        .merge(notes::public_router())
        .merge(news::public_router())
        .nest("/auth", auth::router())
        .merge(protected_routes)
        .fallback(not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::optional_auth,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> AppError {
    AppError::NotFound
}
