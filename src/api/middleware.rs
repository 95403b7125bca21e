//! HTTP middleware, shared state and error responses
//!
//! - `optional_auth` resolves the session token (if any) on every request
//! - `require_login` guards the routes that need a logged-in user
//! - `AppError` turns service failures into pages and redirects

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode, Uri},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use std::convert::Infallible;
use std::sync::Arc;

use super::views::Views;
use crate::models::{Actor, User};
use crate::services::{
    CommentService, CommentServiceError, NewsService, NewsServiceError, NoteService,
    NoteServiceError, UserService, UserServiceError,
};

/// Where anonymous users are sent
pub const LOGIN_URL: &str = "/auth/login/";

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub note_service: Arc<NoteService>,
    pub news_service: Arc<NewsService>,
    pub comment_service: Arc<CommentService>,
    pub views: Arc<Views>,
}

/// Authenticated user, stored in request extensions by [`optional_auth`]
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// The logged-in user, if there is one.
///
/// Never rejects; anonymous requests get `CurrentUser(None)`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<User>);

impl CurrentUser {
    pub fn actor(&self) -> Actor {
        Actor::from(self.0.as_ref().map(|user| user.id))
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentUser(
            parts
                .extensions
                .get::<AuthenticatedUser>()
                .map(|authenticated| authenticated.0.clone()),
        ))
    }
}

/// Error returned by page handlers
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Absent, or not the user's own resource
    #[error("not found")]
    NotFound,

    /// Anonymous access to a page that needs a login
    #[error("login required")]
    LoginRequired { next: Option<String> },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

const NOT_FOUND_PAGE: &str = "<!DOCTYPE html>\n<html lang=\"ru\"><head><meta charset=\"utf-8\"><title>404</title></head>\
<body><h1>Страница не найдена</h1><p><a href=\"/\">На главную</a></p></body></html>";

const SERVER_ERROR_PAGE: &str = "<!DOCTYPE html>\n<html lang=\"ru\"><head><meta charset=\"utf-8\"><title>500</title></head>\
<body><h1>Ошибка сервера</h1></body></html>";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, Html(NOT_FOUND_PAGE)).into_response(),
            AppError::LoginRequired { next } => found(&login_url(next.as_deref())),
            AppError::Internal(err) => {
                tracing::error!("Request failed: {:#}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, Html(SERVER_ERROR_PAGE)).into_response()
            }
        }
    }
}

impl From<NoteServiceError> for AppError {
    fn from(err: NoteServiceError) -> Self {
        match err {
            NoteServiceError::NotFound => AppError::NotFound,
            NoteServiceError::AuthenticationRequired => AppError::LoginRequired { next: None },
            NoteServiceError::Internal(e) => AppError::Internal(e),
            e @ NoteServiceError::Validation { .. } => AppError::Internal(anyhow::anyhow!(e)),
        }
    }
}

impl From<CommentServiceError> for AppError {
    fn from(err: CommentServiceError) -> Self {
        match err {
            CommentServiceError::NotFound => AppError::NotFound,
            CommentServiceError::AuthenticationRequired => AppError::LoginRequired { next: None },
            CommentServiceError::Internal(e) => AppError::Internal(e),
            e @ CommentServiceError::Validation { .. } => AppError::Internal(anyhow::anyhow!(e)),
        }
    }
}

impl From<NewsServiceError> for AppError {
    fn from(err: NewsServiceError) -> Self {
        match err {
            NewsServiceError::NotFound => AppError::NotFound,
            NewsServiceError::Internal(e) => AppError::Internal(e),
            e @ NewsServiceError::Validation { .. } => AppError::Internal(anyhow::anyhow!(e)),
        }
    }
}

impl From<UserServiceError> for AppError {
    fn from(err: UserServiceError) -> Self {
        AppError::Internal(anyhow::anyhow!(err))
    }
}

impl From<tera::Error> for AppError {
    fn from(err: tera::Error) -> Self {
        AppError::Internal(anyhow::Error::new(err).context("Template rendering failed"))
    }
}

/// `302 Found` pointing at `location`
pub fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => {
            tracing::error!(location, "Refusing to redirect to an invalid location");
            (StatusCode::INTERNAL_SERVER_ERROR, Html(SERVER_ERROR_PAGE)).into_response()
        }
    }
}

/// Login page URL carrying the page to come back to.
///
/// `/` stays readable in `next`, everything else is percent-encoded.
pub fn login_url(next: Option<&str>) -> String {
    match next {
        Some(next) => format!(
            "{}?next={}",
            LOGIN_URL,
            urlencoding::encode(next).replace("%2F", "/")
        ),
        None => LOGIN_URL.to_string(),
    }
}

/// Whether `next` is safe to redirect to after login: a local absolute path.
pub fn is_local_path(next: &str) -> bool {
    next.starts_with('/') && !next.starts_with("//") && !next.starts_with("/\\")
}

/// Path plus query string of a request URI
pub fn path_and_query(uri: &Uri) -> String {
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string())
}

/// Extract session token from request
///
/// Checks the `Authorization: Bearer` header first, then the session cookie.
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    cookie_header
        .split(';')
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Resolve the session, if any, and remember the user for the handlers.
///
/// Unknown or expired tokens simply leave the request anonymous.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_session_token(request.headers()) {
        match state.user_service.validate_session(&token).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(AuthenticatedUser(user));
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Session validation failed: {}", e),
        }
    }
    next.run(request).await
}

/// Send anonymous users to the login page with `?next=` set to this page.
///
/// Runs before the handler, so nothing is read or written for them.
pub async fn require_login(request: Request, next: Next) -> Response {
    if request.extensions().get::<AuthenticatedUser>().is_none() {
        let target = path_and_query(request.uri());
        tracing::debug!(%target, "Anonymous request redirected to login");
        return AppError::LoginRequired { next: Some(target) }.into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn create_request_with_auth(token: &str) -> Request<Body> {
        Request::builder()
            .uri("/test")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    }

    fn create_request_with_cookie(cookie: &str) -> Request<Body> {
        Request::builder()
            .uri("/test")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_extract_session_token_from_bearer() {
        let request = create_request_with_auth("test-token-123");
        assert_eq!(extract_session_token(request.headers()), Some("test-token-123".to_string()));
    }

    #[test]
    fn test_extract_session_token_from_cookie() {
        let request = create_request_with_cookie("theme=dark; session=test-token-456");
        assert_eq!(extract_session_token(request.headers()), Some("test-token-456".to_string()));
    }

    #[test]
    fn test_extract_session_token_ignores_similar_cookie_names() {
        let request = create_request_with_cookie("old_session=nope; session=");
        assert!(extract_session_token(request.headers()).is_none());
    }

    #[test]
    fn test_extract_session_token_bearer_priority() {
        let request = Request::builder()
            .uri("/test")
            .header(header::AUTHORIZATION, "Bearer bearer-token")
            .header(header::COOKIE, "session=cookie-token")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_session_token(request.headers()), Some("bearer-token".to_string()));
    }

    #[test]
    fn test_extract_session_token_none() {
        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        assert!(extract_session_token(request.headers()).is_none());
    }

    #[test]
    fn test_login_url_keeps_slashes() {
        assert_eq!(login_url(Some("/add/")), "/auth/login/?next=/add/");
        assert_eq!(
            login_url(Some("/news/1/?page=2")),
            "/auth/login/?next=/news/1/%3Fpage%3D2"
        );
        assert_eq!(login_url(None), "/auth/login/");
    }

    #[test]
    fn test_is_local_path() {
        assert!(is_local_path("/notes/"));
        assert!(!is_local_path("//evil.example/"));
        assert!(!is_local_path("https://evil.example/"));
        assert!(!is_local_path(""));
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(AppError::NotFound.into_response().status(), StatusCode::NOT_FOUND);

        let redirect = AppError::LoginRequired {
            next: Some("/notes/".to_string()),
        }
        .into_response();
        assert_eq!(redirect.status(), StatusCode::FOUND);
        assert_eq!(
            redirect.headers()[header::LOCATION],
            "/auth/login/?next=/notes/"
        );

        let internal = AppError::Internal(anyhow::anyhow!("boom")).into_response();
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
