//! Login, logout and signup pages

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Form, Router,
};
use serde::Deserialize;

use super::middleware::{
    extract_session_token, found, is_local_path, AppError, AppState, CurrentUser, LOGIN_URL,
    SESSION_COOKIE,
};
use super::views::{insert_form_error, page_context};
use crate::models::SignupInput;
use crate::services::UserServiceError;

/// Shown when the username/password pair does not match an account
const INVALID_LOGIN_MESSAGE: &str = "Пожалуйста, введите правильные имя пользователя и пароль. \
Оба поля могут быть чувствительны к регистру.";

/// Create the auth router, mounted under `/auth`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login/", get(login_page).post(login))
        .route("/logout/", get(logout).post(logout))
        .route("/signup/", get(signup_page).post(signup))
}

/// `?next=` on the login page
#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// Login form body
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

/// GET /auth/login/
pub async fn login_page(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<NextQuery>,
) -> Result<Response, AppError> {
    let mut context = page_context(&user);
    context.insert("next", &query.next);
    Ok(state
        .views
        .render("registration/login.html", &context)?
        .into_response())
}

/// POST /auth/login/
///
/// Sets the session cookie and goes back to `next` when it is local.
pub async fn login(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let session = match state
        .user_service
        .login(&form.username, &form.password)
        .await
    {
        Ok(session) => session,
        Err(UserServiceError::InvalidCredentials) => {
            let mut context = page_context(&user);
            context.insert("error", INVALID_LOGIN_MESSAGE);
            context.insert("username", &form.username);
            context.insert("next", &form.next);
            return Ok(state
                .views
                .render("registration/login.html", &context)?
                .into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        session.id,
        state.user_service.session_ttl_days() * 24 * 60 * 60
    );
    let cookie = HeaderValue::from_str(&cookie)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid session cookie: {}", e)))?;

    let target = form
        .next
        .as_deref()
        .filter(|next| is_local_path(next))
        .unwrap_or("/");

    let mut response = found(target);
    response.headers_mut().insert(header::SET_COOKIE, cookie);
    Ok(response)
}

/// GET or POST /auth/logout/
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if let Some(token) = extract_session_token(&headers) {
        state.user_service.logout(&token).await?;
    }

    // The page itself is rendered for an anonymous visitor
    let context = page_context(&CurrentUser(None));
    let page = state.views.render("registration/logged_out.html", &context)?;

    let clear_cookie = format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        SESSION_COOKIE
    );
    let mut response = page.into_response();
    response.headers_mut().insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&clear_cookie)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid cookie: {}", e)))?,
    );
    Ok(response)
}

/// GET /auth/signup/
pub async fn signup_page(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Response, AppError> {
    let mut context = page_context(&user);
    context.insert("form", &SignupForm::default());
    Ok(state
        .views
        .render("registration/signup.html", &context)?
        .into_response())
}

/// What the signup form shows back; passwords are never echoed
#[derive(Debug, Default, serde::Serialize)]
struct SignupForm {
    username: String,
}

/// POST /auth/signup/
pub async fn signup(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(input): Form<SignupInput>,
) -> Result<Response, AppError> {
    let (field, message) = match state.user_service.signup(&input).await {
        Ok(_) => return Ok(found(LOGIN_URL)),
        Err(UserServiceError::Validation { field, message }) => (field, message),
        Err(UserServiceError::UserExists(_)) => (
            "username",
            "Пользователь с таким именем уже существует.".to_string(),
        ),
        Err(e) => return Err(e.into()),
    };

    let mut context = page_context(&user);
    context.insert(
        "form",
        &SignupForm {
            username: input.username.clone(),
        },
    );
    insert_form_error(&mut context, field, &message);
    Ok(state
        .views
        .render("registration/signup.html", &context)?
        .into_response())
}
