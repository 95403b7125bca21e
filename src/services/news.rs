//! News service
//!
//! News is public and read-only for visitors; items are published out of
//! band through [`NewsService::publish`].

use crate::db::repositories::NewsRepository;
use crate::models::{News, NewsInput};
use anyhow::Context;
use std::sync::Arc;

/// Longest accepted news title
pub const MAX_TITLE_LENGTH: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum NewsServiceError {
    #[error("News not found")]
    NotFound,

    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub struct NewsService {
    repo: Arc<dyn NewsRepository>,
    home_page_count: i64,
}

impl NewsService {
    pub fn new(repo: Arc<dyn NewsRepository>, home_page_count: i64) -> Self {
        Self {
            repo,
            home_page_count,
        }
    }

    /// Items for the news home page, newest publication date first
    pub async fn home(&self) -> Result<Vec<News>, NewsServiceError> {
        let news = self
            .repo
            .list_latest(self.home_page_count)
            .await
            .context("Failed to list news")?;
        Ok(news)
    }

    pub async fn get(&self, id: i64) -> Result<News, NewsServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get news")?
            .ok_or(NewsServiceError::NotFound)
    }

    /// Publish a news item
    pub async fn publish(&self, input: &NewsInput) -> Result<News, NewsServiceError> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(NewsServiceError::Validation {
                field: "title",
                message: "Обязательное поле.".to_string(),
            });
        }
        if title.chars().count() > MAX_TITLE_LENGTH {
            return Err(NewsServiceError::Validation {
                field: "title",
                message: format!("Не более {} символов.", MAX_TITLE_LENGTH),
            });
        }

        let news = self
            .repo
            .create(&NewsInput {
                title: title.to_string(),
                ..input.clone()
            })
            .await
            .context("Failed to publish news")?;

        tracing::info!(news_id = news.id, "News published");
        Ok(news)
    }
}
