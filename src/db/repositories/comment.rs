//! Comment repository
//!
//! `created_at` is assigned here, never by callers. Within one news item it
//! strictly increases with insertion order: when the clock has not moved
//! past the newest existing comment, the new one is stamped one microsecond
//! later. Inserts are serialized through a mutex so two writers cannot both
//! read the same "newest" timestamp.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Comment, CommentWithAuthor};

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Insert a comment stamped with the next creation time for `news_id`
    async fn create(&self, news_id: i64, author_id: i64, text: &str) -> Result<Comment>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Comments of a news item ordered by `(created_at, id)` ascending
    async fn list_by_news(&self, news_id: i64) -> Result<Vec<CommentWithAuthor>>;

    /// Replace the text; the creation time is left alone
    async fn update_text(&self, id: i64, text: &str) -> Result<()>;

    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based comment repository implementation
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
    insert_lock: Mutex<()>,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self {
            pool,
            insert_lock: Mutex::new(()),
        }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

/// Next creation time given the newest one already stored for the news item.
///
/// Microsecond precision, the finest MySQL `TIMESTAMP(6)` keeps.
pub fn next_created_at(latest: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    let now = now.trunc_subsecs(6);
    match latest {
        Some(latest) if now <= latest => latest + Duration::microseconds(1),
        _ => now,
    }
}

const SELECT_COMMENT: &str = "SELECT id, news_id, author_id, text, created_at FROM comments";

const SELECT_WITH_AUTHOR: &str = r#"
    SELECT c.id, c.news_id, c.author_id, c.text, c.created_at, u.username
    FROM comments c
    JOIN users u ON c.author_id = u.id
    WHERE c.news_id = ?
    ORDER BY c.created_at ASC, c.id ASC
"#;

const SELECT_LATEST: &str =
    "SELECT created_at FROM comments WHERE news_id = ? ORDER BY created_at DESC, id DESC LIMIT 1";

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, news_id: i64, author_id: i64, text: &str) -> Result<Comment> {
        let _guard = self.insert_lock.lock().await;

        let (id, created_at) = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_comment_sqlite(self.pool.sqlite()?, news_id, author_id, text).await?
            }
            DatabaseDriver::Mysql => {
                create_comment_mysql(self.pool.mysql()?, news_id, author_id, text).await?
            }
        };

        Ok(Comment {
            id,
            news_id,
            author_id,
            text: text.to_string(),
            created_at,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        let sql = format!("{} WHERE id = ?", SELECT_COMMENT);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get comment")?;
                Ok(row.as_ref().map(row_to_comment_sqlite))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get comment")?;
                Ok(row.as_ref().map(row_to_comment_mysql))
            }
        }
    }

    async fn list_by_news(&self, news_id: i64) -> Result<Vec<CommentWithAuthor>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(SELECT_WITH_AUTHOR)
                    .bind(news_id)
                    .fetch_all(self.pool.sqlite()?)
                    .await
                    .context("Failed to list comments")?;
                Ok(rows
                    .iter()
                    .map(|row| CommentWithAuthor {
                        comment: row_to_comment_sqlite(row),
                        author: row.get("username"),
                    })
                    .collect())
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(SELECT_WITH_AUTHOR)
                    .bind(news_id)
                    .fetch_all(self.pool.mysql()?)
                    .await
                    .context("Failed to list comments")?;
                Ok(rows
                    .iter()
                    .map(|row| CommentWithAuthor {
                        comment: row_to_comment_mysql(row),
                        author: row.get("username"),
                    })
                    .collect())
            }
        }
    }

    async fn update_text(&self, id: i64, text: &str) -> Result<()> {
        let sql = "UPDATE comments SET text = ? WHERE id = ?";
        let result = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(text)
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .map(|_| ()),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(text)
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .map(|_| ()),
        };
        result.context("Failed to update comment")
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let sql = "DELETE FROM comments WHERE id = ?";
        let result = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .map(|_| ()),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .map(|_| ()),
        };
        result.context("Failed to delete comment")
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_comment_sqlite(
    pool: &SqlitePool,
    news_id: i64,
    author_id: i64,
    text: &str,
) -> Result<(i64, DateTime<Utc>)> {
    let latest: Option<DateTime<Utc>> = sqlx::query(SELECT_LATEST)
        .bind(news_id)
        .fetch_optional(pool)
        .await
        .context("Failed to read latest comment time")?
        .map(|row| row.get("created_at"));
    let created_at = next_created_at(latest, Utc::now());

    let result = sqlx::query(
        "INSERT INTO comments (news_id, author_id, text, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(news_id)
    .bind(author_id)
    .bind(text)
    .bind(created_at)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok((result.last_insert_rowid(), created_at))
}

fn row_to_comment_sqlite(row: &sqlx::sqlite::SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        news_id: row.get("news_id"),
        author_id: row.get("author_id"),
        text: row.get("text"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_comment_mysql(
    pool: &MySqlPool,
    news_id: i64,
    author_id: i64,
    text: &str,
) -> Result<(i64, DateTime<Utc>)> {
    let latest: Option<DateTime<Utc>> = sqlx::query(SELECT_LATEST)
        .bind(news_id)
        .fetch_optional(pool)
        .await
        .context("Failed to read latest comment time")?
        .map(|row| row.get("created_at"));
    let created_at = next_created_at(latest, Utc::now());

    let result = sqlx::query(
        "INSERT INTO comments (news_id, author_id, text, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(news_id)
    .bind(author_id)
    .bind(text)
    .bind(created_at)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok((result.last_insert_id() as i64, created_at))
}

fn row_to_comment_mysql(row: &sqlx::mysql::MySqlRow) -> Comment {
    Comment {
        id: row.get("id"),
        news_id: row.get("news_id"),
        author_id: row.get("author_id"),
        text: row.get("text"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxCommentRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let sqlite = pool.as_sqlite().unwrap();
        for (id, name) in [(1, "alice"), (2, "bob")] {
            sqlx::query("INSERT INTO users (id, username, password_hash) VALUES (?, ?, 'hash')")
                .bind(id)
                .bind(name)
                .execute(sqlite)
                .await
                .expect("Failed to create test user");
        }
        for id in [1, 2] {
            sqlx::query("INSERT INTO news (id, title, text, date) VALUES (?, 'Заголовок', 'Текст', '2024-01-01')")
                .bind(id)
                .execute(sqlite)
                .await
                .expect("Failed to create test news");
        }
        let repo = SqlxCommentRepository::new(pool.clone());
        (pool, repo)
    }

    #[test]
    fn test_next_created_at_uses_clock_when_it_advanced() {
        let latest = Utc::now() - Duration::seconds(5);
        let now = Utc::now();

        assert_eq!(next_created_at(Some(latest), now), now.trunc_subsecs(6));
        assert_eq!(next_created_at(None, now), now.trunc_subsecs(6));
    }

    #[test]
    fn test_next_created_at_bumps_when_clock_stalls() {
        let latest = Utc::now().trunc_subsecs(6);

        assert_eq!(
            next_created_at(Some(latest), latest),
            latest + Duration::microseconds(1)
        );
        // A clock that went backwards still yields a later stamp.
        assert_eq!(
            next_created_at(Some(latest), latest - Duration::seconds(1)),
            latest + Duration::microseconds(1)
        );
    }

    #[tokio::test]
    async fn test_create_and_get_comment() {
        let (_pool, repo) = setup_test_repo().await;

        let created = repo.create(1, 2, "Текст комментария").await.unwrap();
        let found = repo
            .get_by_id(created.id)
            .await
            .expect("Query failed")
            .expect("Comment not found");

        assert_eq!(found, created);
        assert_eq!(repo.list_by_news(1).await.unwrap().len(), 1);
        assert!(repo.list_by_news(2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_created_at_strictly_increases_with_insertion() {
        let (_pool, repo) = setup_test_repo().await;

        let mut stamps = Vec::new();
        for i in 0..20 {
            let author = if i % 2 == 0 { 1 } else { 2 };
            stamps.push(repo.create(1, author, &format!("Текст {}", i)).await.unwrap());
        }

        for pair in stamps.windows(2) {
            assert!(pair[0].created_at < pair[1].created_at);
        }

        let listed: Vec<i64> = repo
            .list_by_news(1)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.comment.id)
            .collect();
        let inserted: Vec<i64> = stamps.iter().map(|c| c.id).collect();
        assert_eq!(listed, inserted);
    }

    #[tokio::test]
    async fn test_list_by_news_carries_author_name() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(1, 1, "first").await.unwrap();
        repo.create(2, 2, "elsewhere").await.unwrap();

        let comments = repo.list_by_news(1).await.unwrap();

        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].author, "alice");
        assert_eq!(comments[0].comment.text, "first");
    }

    #[tokio::test]
    async fn test_update_text_keeps_created_at() {
        let (_pool, repo) = setup_test_repo().await;
        let created = repo.create(1, 1, "before").await.unwrap();

        repo.update_text(created.id, "after").await.unwrap();
        let found = repo.get_by_id(created.id).await.unwrap().unwrap();

        assert_eq!(found.text, "after");
        assert_eq!(found.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_delete_comment() {
        let (_pool, repo) = setup_test_repo().await;
        let created = repo.create(1, 1, "bye").await.unwrap();

        repo.delete(created.id).await.unwrap();

        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
        assert!(repo.list_by_news(1).await.unwrap().is_empty());
    }
}
