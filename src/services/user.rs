//! User service
//!
//! Signup, login and logout, plus resolving a session token back to its
//! user. Expired sessions are deleted the moment they are seen.

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{Session, SignupInput, User};
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use std::sync::Arc;

/// Default session lifetime in days
const DEFAULT_SESSION_TTL_DAYS: i64 = 7;

/// Longest accepted username
const MAX_USERNAME_LENGTH: usize = 150;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Wrong username or password
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// A form field failed validation
    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    /// Username already registered
    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// User service for accounts and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_ttl_days: i64,
}

impl UserService {
    /// Create a user service with the default session lifetime
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
    ) -> Self {
        Self::with_session_ttl(user_repo, session_repo, DEFAULT_SESSION_TTL_DAYS)
    }

    /// Create a user service whose sessions live `session_ttl_days`
    pub fn with_session_ttl(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_ttl_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_ttl_days,
        }
    }

    /// Session lifetime in days
    pub fn session_ttl_days(&self) -> i64 {
        self.session_ttl_days
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// - `Validation` for a blank or overlong username, an empty password,
    ///   or a confirmation that does not match
    /// - `UserExists` if the username is taken
    pub async fn signup(&self, input: &SignupInput) -> Result<User, UserServiceError> {
        let username = input.username.trim();
        validate_signup(username, input)?;

        if self
            .user_repo
            .get_by_username(username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(username.to_string()));
        }

        let password_hash = hash_password(&input.password1)?;
        let user = self
            .user_repo
            .create(&User::new(username.to_string(), password_hash))
            .await
            .context("Failed to create user")?;

        tracing::info!(user_id = user.id, username = %user.username, "User signed up");
        Ok(user)
    }

    /// Check credentials and open a new session.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, UserServiceError> {
        let user = self
            .user_repo
            .get_by_username(username.trim())
            .await
            .context("Failed to get user by username")?
            .ok_or(UserServiceError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            tracing::debug!(user_id = user.id, "Login rejected: wrong password");
            return Err(UserServiceError::InvalidCredentials);
        }

        let session = Session::start(user.id, self.session_ttl_days).ok_or_else(|| {
            anyhow::anyhow!("Session lifetime of {} days overflows", self.session_ttl_days)
        })?;
        let session = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        tracing::info!(user_id = user.id, "User logged in");
        Ok(session)
    }

    /// Invalidate a session. Unknown tokens are ignored.
    pub async fn logout(&self, token: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(token)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?;
        Ok(user)
    }

    /// Resolve a session token to its user.
    ///
    /// `None` for unknown or expired tokens; an expired one is deleted.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let Some(session) = self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        else {
            return Ok(None);
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(token).await {
                tracing::warn!("Failed to delete expired session: {:#}", e);
            }
            return Ok(None);
        }

        self.get_by_id(session.user_id).await
    }

    /// Purge every expired session, returning how many went away
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;
        Ok(count)
    }
}

fn validate_signup(username: &str, input: &SignupInput) -> Result<(), UserServiceError> {
    if username.is_empty() {
        return Err(UserServiceError::Validation {
            field: "username",
            message: "Обязательное поле.".to_string(),
        });
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(UserServiceError::Validation {
            field: "username",
            message: format!("Не более {} символов.", MAX_USERNAME_LENGTH),
        });
    }
    if input.password1.is_empty() {
        return Err(UserServiceError::Validation {
            field: "password1",
            message: "Обязательное поле.".to_string(),
        });
    }
    if input.password1 != input.password2 {
        return Err(UserServiceError::Validation {
            field: "password2",
            message: "Введенные пароли не совпадают.".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations, DynDatabasePool};

    async fn setup_test_service(ttl_days: i64) -> (DynDatabasePool, UserService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let service = UserService::with_session_ttl(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
            ttl_days,
        );
        (pool, service)
    }

    fn signup_input(username: &str, password: &str) -> SignupInput {
        SignupInput {
            username: username.to_string(),
            password1: password.to_string(),
            password2: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_signup_and_login() {
        let (_pool, service) = setup_test_service(7).await;

        let user = service
            .signup(&signup_input("alice", "secret"))
            .await
            .expect("Signup failed");
        let session = service.login("alice", "secret").await.expect("Login failed");

        assert_eq!(session.user_id, user.id);
        let resolved = service
            .validate_session(&session.id)
            .await
            .expect("Validation failed")
            .expect("Session should resolve");
        assert_eq!(resolved.username, "alice");
    }

    #[tokio::test]
    async fn test_login_with_overflowing_ttl_is_an_error() {
        let (_pool, service) = setup_test_service(100_000_000).await;
        service.signup(&signup_input("alice", "secret")).await.unwrap();

        let result = service.login("alice", "secret").await;

        assert!(matches!(result, Err(UserServiceError::Internal(_))));
    }

    #[tokio::test]
    async fn test_signup_duplicate_username_fails() {
        let (_pool, service) = setup_test_service(7).await;
        service.signup(&signup_input("alice", "secret")).await.unwrap();

        let result = service.signup(&signup_input(" alice ", "other")).await;

        assert!(matches!(result, Err(UserServiceError::UserExists(_))));
    }

    #[tokio::test]
    async fn test_signup_validation() {
        let (_pool, service) = setup_test_service(7).await;

        let blank = service.signup(&signup_input("  ", "secret")).await;
        assert!(matches!(
            blank,
            Err(UserServiceError::Validation { field: "username", .. })
        ));

        let empty_password = service.signup(&signup_input("bob", "")).await;
        assert!(matches!(
            empty_password,
            Err(UserServiceError::Validation { field: "password1", .. })
        ));

        let mismatch = service
            .signup(&SignupInput {
                username: "bob".to_string(),
                password1: "one".to_string(),
                password2: "two".to_string(),
            })
            .await;
        assert!(matches!(
            mismatch,
            Err(UserServiceError::Validation { field: "password2", .. })
        ));
    }

    #[tokio::test]
    async fn test_login_wrong_credentials() {
        let (_pool, service) = setup_test_service(7).await;
        service.signup(&signup_input("alice", "secret")).await.unwrap();

        assert!(matches!(
            service.login("alice", "wrong").await,
            Err(UserServiceError::InvalidCredentials)
        ));
        assert!(matches!(
            service.login("nobody", "secret").await,
            Err(UserServiceError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_logout_invalidates_session() {
        let (_pool, service) = setup_test_service(7).await;
        service.signup(&signup_input("alice", "secret")).await.unwrap();
        let session = service.login("alice", "secret").await.unwrap();

        service.logout(&session.id).await.expect("Logout failed");

        assert!(service.validate_session(&session.id).await.unwrap().is_none());
        service
            .logout(&session.id)
            .await
            .expect("Logging out twice should succeed");
    }

    #[tokio::test]
    async fn test_expired_session_is_anonymous_and_deleted() {
        let (_pool, service) = setup_test_service(-1).await;
        service.signup(&signup_input("alice", "secret")).await.unwrap();
        let session = service.login("alice", "secret").await.unwrap();

        assert!(service.validate_session(&session.id).await.unwrap().is_none());
        assert_eq!(service.cleanup_expired_sessions().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cleanup_expired_sessions() {
        let (_pool, service) = setup_test_service(-1).await;
        service.signup(&signup_input("alice", "secret")).await.unwrap();
        service.login("alice", "secret").await.unwrap();
        service.login("alice", "secret").await.unwrap();

        assert_eq!(service.cleanup_expired_sessions().await.unwrap(), 2);
    }
}
