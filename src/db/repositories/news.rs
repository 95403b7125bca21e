//! News repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{News, NewsInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// News repository trait
#[async_trait]
pub trait NewsRepository: Send + Sync {
    async fn create(&self, input: &NewsInput) -> Result<News>;

    async fn get_by_id(&self, id: i64) -> Result<Option<News>>;

    /// Newest `limit` items by publication date, ties broken by newest id
    async fn list_latest(&self, limit: i64) -> Result<Vec<News>>;
}

/// SQLx-based news repository implementation
pub struct SqlxNewsRepository {
    pool: DynDatabasePool,
}

impl SqlxNewsRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn NewsRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_NEWS: &str = "SELECT id, title, text, date FROM news";

#[async_trait]
impl NewsRepository for SqlxNewsRepository {
    async fn create(&self, input: &NewsInput) -> Result<News> {
        let sql = "INSERT INTO news (title, text, date) VALUES (?, ?, ?)";
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(&input.title)
                .bind(&input.text)
                .bind(input.date)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to create news")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(&input.title)
                .bind(&input.text)
                .bind(input.date)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to create news")?
                .last_insert_id() as i64,
        };

        Ok(News {
            id,
            title: input.title.clone(),
            text: input.text.clone(),
            date: input.date,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<News>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_news_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_news_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn list_latest(&self, limit: i64) -> Result<Vec<News>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_latest_sqlite(self.pool.sqlite()?, limit).await,
            DatabaseDriver::Mysql => list_latest_mysql(self.pool.mysql()?, limit).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn get_news_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<News>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_NEWS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get news by ID")?;

    Ok(row.as_ref().map(row_to_news_sqlite))
}

async fn list_latest_sqlite(pool: &SqlitePool, limit: i64) -> Result<Vec<News>> {
    let rows = sqlx::query(&format!("{} ORDER BY date DESC, id DESC LIMIT ?", SELECT_NEWS))
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to list news")?;

    Ok(rows.iter().map(row_to_news_sqlite).collect())
}

fn row_to_news_sqlite(row: &sqlx::sqlite::SqliteRow) -> News {
    News {
        id: row.get("id"),
        title: row.get("title"),
        text: row.get("text"),
        date: row.get("date"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn get_news_mysql(pool: &MySqlPool, id: i64) -> Result<Option<News>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_NEWS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get news by ID")?;

    Ok(row.as_ref().map(row_to_news_mysql))
}

async fn list_latest_mysql(pool: &MySqlPool, limit: i64) -> Result<Vec<News>> {
    let rows = sqlx::query(&format!("{} ORDER BY date DESC, id DESC LIMIT ?", SELECT_NEWS))
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to list news")?;

    Ok(rows.iter().map(row_to_news_mysql).collect())
}

fn row_to_news_mysql(row: &sqlx::mysql::MySqlRow) -> News {
    News {
        id: row.get("id"),
        title: row.get("title"),
        text: row.get("text"),
        date: row.get("date"),
    }
}
