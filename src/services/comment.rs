//! Comment service
//!
//! Any logged-in user may comment on a news item; only the author may
//! change or remove a comment afterwards. New and edited text passes the
//! moderation filter before anything is written.

use crate::db::repositories::{CommentRepository, NewsRepository};
use crate::models::{Actor, Comment, CommentInput, CommentWithAuthor};
use crate::services::access::{authorize, AccessError, Action};
use crate::services::moderation::{ModerationFilter, TEXT_FIELD};
use anyhow::Context;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    /// Comment or news item absent, or the comment is someone else's
    #[error("Not found")]
    NotFound,

    #[error("Authentication required")]
    AuthenticationRequired,

    /// Empty or moderated text; nothing was written
    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<AccessError> for CommentServiceError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::NotFound => CommentServiceError::NotFound,
            AccessError::AuthenticationRequired => CommentServiceError::AuthenticationRequired,
        }
    }
}

pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
    news_repo: Arc<dyn NewsRepository>,
    moderation: ModerationFilter,
}

impl CommentService {
    pub fn new(
        repo: Arc<dyn CommentRepository>,
        news_repo: Arc<dyn NewsRepository>,
        moderation: ModerationFilter,
    ) -> Self {
        Self {
            repo,
            news_repo,
            moderation,
        }
    }

    /// Comments under a news item, oldest first
    pub async fn list_for_news(
        &self,
        news_id: i64,
    ) -> Result<Vec<CommentWithAuthor>, CommentServiceError> {
        let comments = self
            .repo
            .list_by_news(news_id)
            .await
            .context("Failed to list comments")?;
        Ok(comments)
    }

    /// Post a comment as `actor` under news item `news_id`.
    pub async fn create(
        &self,
        news_id: i64,
        input: &CommentInput,
        actor: Actor,
    ) -> Result<Comment, CommentServiceError> {
        let author_id = actor
            .user_id()
            .ok_or(CommentServiceError::AuthenticationRequired)?;

        if self
            .news_repo
            .get_by_id(news_id)
            .await
            .context("Failed to get news")?
            .is_none()
        {
            return Err(CommentServiceError::NotFound);
        }

        let text = self.clean(input)?;
        let comment = self
            .repo
            .create(news_id, author_id, text)
            .await
            .context("Failed to create comment")?;

        tracing::info!(comment_id = comment.id, news_id, "Comment created");
        Ok(comment)
    }

    /// Fetch a comment for `action`; only its author gets it.
    pub async fn get_for_owner(
        &self,
        id: i64,
        actor: Actor,
        action: Action,
    ) -> Result<Comment, CommentServiceError> {
        if !actor.is_authenticated() {
            return Err(CommentServiceError::AuthenticationRequired);
        }
        let comment = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get comment")?;
        Ok(authorize(comment, actor, action)?)
    }

    /// Replace the text of the actor's own comment.
    pub async fn update(
        &self,
        id: i64,
        input: &CommentInput,
        actor: Actor,
    ) -> Result<Comment, CommentServiceError> {
        let comment = self.get_for_owner(id, actor, Action::Edit).await?;
        let text = self.clean(input)?;

        self.repo
            .update_text(comment.id, text)
            .await
            .context("Failed to update comment")?;

        tracing::info!(comment_id = comment.id, "Comment updated");
        Ok(Comment {
            text: text.to_string(),
            ..comment
        })
    }

    /// Delete the actor's own comment, returning what was removed.
    pub async fn delete(&self, id: i64, actor: Actor) -> Result<Comment, CommentServiceError> {
        let comment = self.get_for_owner(id, actor, Action::Delete).await?;
        self.repo
            .delete(comment.id)
            .await
            .context("Failed to delete comment")?;

        tracing::info!(comment_id = comment.id, "Comment deleted");
        Ok(comment)
    }

    fn clean<'a>(&self, input: &'a CommentInput) -> Result<&'a str, CommentServiceError> {
        if input.text.trim().is_empty() {
            return Err(CommentServiceError::Validation {
                field: TEXT_FIELD,
                message: "Обязательное поле.".to_string(),
            });
        }
        self.moderation
            .validate(&input.text)
            .map_err(|rejected| CommentServiceError::Validation {
                field: rejected.field,
                message: rejected.message,
            })?;
        Ok(&input.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModerationConfig;
    use crate::db::repositories::{SqlxCommentRepository, SqlxNewsRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::NewsInput;
    use chrono::NaiveDate;

    const ALICE: Actor = Actor::User(1);
    const BOB: Actor = Actor::User(2);

    async fn setup_test_service() -> (CommentService, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        for (id, name) in [(1, "alice"), (2, "bob")] {
            sqlx::query("INSERT INTO users (id, username, password_hash) VALUES (?, ?, 'hash')")
                .bind(id)
                .bind(name)
                .execute(pool.as_sqlite().unwrap())
                .await
                .expect("Failed to create test user");
        }
        let news_repo = SqlxNewsRepository::boxed(pool.clone());
        let news = news_repo
            .create(&NewsInput {
                title: "Тестовая новость".to_string(),
                text: "Просто текст.".to_string(),
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            })
            .await
            .expect("Failed to create news");
        let moderation = ModerationFilter::from_config(&ModerationConfig::default()).unwrap();
        let service = CommentService::new(SqlxCommentRepository::boxed(pool), news_repo, moderation);
        (service, news.id)
    }

    fn text(s: &str) -> CommentInput {
        CommentInput { text: s.to_string() }
    }

    #[tokio::test]
    async fn test_create_comment() {
        let (service, news_id) = setup_test_service().await;

        let comment = service
            .create(news_id, &text("Текст комментария"), ALICE)
            .await
            .expect("Create failed");

        assert_eq!(comment.news_id, news_id);
        assert_eq!(comment.author_id, 1);
        assert_eq!(comment.text, "Текст комментария");
        assert_eq!(service.list_for_news(news_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_banned_word_is_not_persisted() {
        let (service, news_id) = setup_test_service().await;

        let err = service
            .create(news_id, &text("Какой-то текст, редиска, еще текст"), ALICE)
            .await
            .unwrap_err();

        match err {
            CommentServiceError::Validation { field, message } => {
                assert_eq!(field, "text");
                assert_eq!(message, "Не ругайтесь!");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(service.list_for_news(news_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_anonymous_and_unknown_news() {
        let (service, news_id) = setup_test_service().await;

        assert!(matches!(
            service.create(news_id, &text("привет"), Actor::Anonymous).await,
            Err(CommentServiceError::AuthenticationRequired)
        ));
        assert!(matches!(
            service.create(news_id + 100, &text("привет"), ALICE).await,
            Err(CommentServiceError::NotFound)
        ));
        assert!(matches!(
            service.create(news_id, &text("   "), ALICE).await,
            Err(CommentServiceError::Validation { field: "text", .. })
        ));
        assert!(service.list_for_news(news_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_other_user_cannot_edit_or_delete() {
        let (service, news_id) = setup_test_service().await;
        let comment = service.create(news_id, &text("Оригинал"), ALICE).await.unwrap();

        assert!(matches!(
            service.update(comment.id, &text("Подмена"), BOB).await,
            Err(CommentServiceError::NotFound)
        ));
        assert!(matches!(
            service.delete(comment.id, BOB).await,
            Err(CommentServiceError::NotFound)
        ));

        let stored = service.list_for_news(news_id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].comment.text, "Оригинал");
    }

    #[tokio::test]
    async fn test_author_edits_and_deletes() {
        let (service, news_id) = setup_test_service().await;
        let comment = service.create(news_id, &text("Оригинал"), ALICE).await.unwrap();

        let updated = service
            .update(comment.id, &text("Правка"), ALICE)
            .await
            .expect("Update failed");
        assert_eq!(updated.text, "Правка");
        assert_eq!(updated.created_at, comment.created_at);

        service.delete(comment.id, ALICE).await.expect("Delete failed");
        assert!(service.list_for_news(news_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_moderation_applies_to_edits() {
        let (service, news_id) = setup_test_service().await;
        let comment = service.create(news_id, &text("Оригинал"), ALICE).await.unwrap();

        let err = service
            .update(comment.id, &text("ты негодяй"), ALICE)
            .await
            .unwrap_err();

        assert!(matches!(err, CommentServiceError::Validation { field: "text", .. }));
        let stored = service.list_for_news(news_id).await.unwrap();
        assert_eq!(stored[0].comment.text, "Оригинал");
    }
}
