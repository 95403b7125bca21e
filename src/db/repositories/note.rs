//! Note repository
//!
//! The `notes.slug` UNIQUE constraint is the final word on slug uniqueness.
//! A violation surfaces as [`SlugTaken`] inside the returned `anyhow::Error`,
//! so callers can tell it apart from other failures with `downcast_ref`.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Note;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Raised when an insert or update hits the unique slug constraint
#[derive(Debug, thiserror::Error)]
#[error("slug already taken: {0}")]
pub struct SlugTaken(pub String);

/// Note repository trait
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Insert a note; `note.id` is ignored
    async fn create(&self, note: &Note) -> Result<Note>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Note>>;

    /// All notes written by `author_id`, oldest first
    async fn list_by_author(&self, author_id: i64) -> Result<Vec<Note>>;

    /// Overwrite title, text and slug of `note.id`
    async fn update(&self, note: &Note) -> Result<Note>;

    async fn delete(&self, id: i64) -> Result<()>;

    /// Check whether `slug` is used by any note other than `exclude_id`
    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;
}

/// SQLx-based note repository implementation
pub struct SqlxNoteRepository {
    pool: DynDatabasePool,
}

impl SqlxNoteRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn NoteRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl NoteRepository for SqlxNoteRepository {
    async fn create(&self, note: &Note) -> Result<Note> {
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => create_note_sqlite(self.pool.sqlite()?, note).await?,
            DatabaseDriver::Mysql => create_note_mysql(self.pool.mysql()?, note).await?,
        };
        Ok(Note { id, ..note.clone() })
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Note>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_note_by_slug_sqlite(self.pool.sqlite()?, slug).await,
            DatabaseDriver::Mysql => get_note_by_slug_mysql(self.pool.mysql()?, slug).await,
        }
    }

    async fn list_by_author(&self, author_id: i64) -> Result<Vec<Note>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_notes_sqlite(self.pool.sqlite()?, author_id).await,
            DatabaseDriver::Mysql => list_notes_mysql(self.pool.mysql()?, author_id).await,
        }
    }

    async fn update(&self, note: &Note) -> Result<Note> {
        let result = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query("UPDATE notes SET title = ?, text = ?, slug = ? WHERE id = ?")
                    .bind(&note.title)
                    .bind(&note.text)
                    .bind(&note.slug)
                    .bind(note.id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .map(|_| ())
            }
            DatabaseDriver::Mysql => {
                sqlx::query("UPDATE notes SET title = ?, text = ?, slug = ? WHERE id = ?")
                    .bind(&note.title)
                    .bind(&note.text)
                    .bind(&note.slug)
                    .bind(note.id)
                    .execute(self.pool.mysql()?)
                    .await
                    .map(|_| ())
            }
        };
        result
            .map_err(|e| slug_error(e, &note.slug))
            .context("Failed to update note")?;

        Ok(note.clone())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let result = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query("DELETE FROM notes WHERE id = ?")
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .map(|_| ()),
            DatabaseDriver::Mysql => sqlx::query("DELETE FROM notes WHERE id = ?")
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .map(|_| ()),
        };
        result.context("Failed to delete note")
    }

    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let exclude_id = exclude_id.unwrap_or(0);
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query("SELECT COUNT(*) as count FROM notes WHERE slug = ? AND id != ?")
                    .bind(slug)
                    .bind(exclude_id)
                    .fetch_one(self.pool.sqlite()?)
                    .await
                    .context("Failed to check slug")?
                    .get("count")
            }
            DatabaseDriver::Mysql => {
                sqlx::query("SELECT COUNT(*) as count FROM notes WHERE slug = ? AND id != ?")
                    .bind(slug)
                    .bind(exclude_id)
                    .fetch_one(self.pool.mysql()?)
                    .await
                    .context("Failed to check slug")?
                    .get("count")
            }
        };
        Ok(count > 0)
    }
}

/// Turn a unique violation into [`SlugTaken`], leave anything else alone.
fn slug_error(err: sqlx::Error, slug: &str) -> anyhow::Error {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            anyhow::Error::new(SlugTaken(slug.to_string()))
        }
        _ => anyhow::Error::new(err),
    }
}

/// Whether `err` (anywhere in its chain) is a [`SlugTaken`]
pub fn is_slug_taken(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| cause.is::<SlugTaken>())
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_note_sqlite(pool: &SqlitePool, note: &Note) -> Result<i64> {
    let result = sqlx::query("INSERT INTO notes (title, text, slug, author_id) VALUES (?, ?, ?, ?)")
        .bind(&note.title)
        .bind(&note.text)
        .bind(&note.slug)
        .bind(note.author_id)
        .execute(pool)
        .await
        .map_err(|e| slug_error(e, &note.slug))
        .context("Failed to create note")?;

    Ok(result.last_insert_rowid())
}

async fn get_note_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Note>> {
    let row = sqlx::query("SELECT id, title, text, slug, author_id FROM notes WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get note by slug")?;

    Ok(row.as_ref().map(row_to_note_sqlite))
}

async fn list_notes_sqlite(pool: &SqlitePool, author_id: i64) -> Result<Vec<Note>> {
    let rows = sqlx::query(
        "SELECT id, title, text, slug, author_id FROM notes WHERE author_id = ? ORDER BY id",
    )
    .bind(author_id)
    .fetch_all(pool)
    .await
    .context("Failed to list notes")?;

    Ok(rows.iter().map(row_to_note_sqlite).collect())
}

fn row_to_note_sqlite(row: &sqlx::sqlite::SqliteRow) -> Note {
    Note {
        id: row.get("id"),
        title: row.get("title"),
        text: row.get("text"),
        slug: row.get("slug"),
        author_id: row.get("author_id"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_note_mysql(pool: &MySqlPool, note: &Note) -> Result<i64> {
    let result = sqlx::query("INSERT INTO notes (title, text, slug, author_id) VALUES (?, ?, ?, ?)")
        .bind(&note.title)
        .bind(&note.text)
        .bind(&note.slug)
        .bind(note.author_id)
        .execute(pool)
        .await
        .map_err(|e| slug_error(e, &note.slug))
        .context("Failed to create note")?;

    Ok(result.last_insert_id() as i64)
}

async fn get_note_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<Option<Note>> {
    let row = sqlx::query("SELECT id, title, text, slug, author_id FROM notes WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get note by slug")?;

    Ok(row.as_ref().map(row_to_note_mysql))
}

async fn list_notes_mysql(pool: &MySqlPool, author_id: i64) -> Result<Vec<Note>> {
    let rows = sqlx::query(
        "SELECT id, title, text, slug, author_id FROM notes WHERE author_id = ? ORDER BY id",
    )
    .bind(author_id)
    .fetch_all(pool)
    .await
    .context("Failed to list notes")?;

    Ok(rows.iter().map(row_to_note_mysql).collect())
}

fn row_to_note_mysql(row: &sqlx::mysql::MySqlRow) -> Note {
    Note {
        id: row.get("id"),
        title: row.get("title"),
        text: row.get("text"),
        slug: row.get("slug"),
        author_id: row.get("author_id"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxNoteRepository) {
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
        let repo = SqlxNoteRepository::new(pool.clone());
        (pool, repo)
    }

    fn note(slug: &str, author_id: i64) -> Note {
        Note {
            id: 0,
            title: "Заголовок".to_string(),
            text: "Текст".to_string(),
            slug: slug.to_string(),
            author_id,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_by_slug() {
        let (_pool, repo) = setup_test_repo().await;

        let created = repo.create(&note("slug-text", 1)).await.expect("Failed to create");
        assert!(created.id > 0);

        let found = repo
            .get_by_slug("slug-text")
            .await
            .expect("Query failed")
            .expect("Note not found");
        assert_eq!(found, created);
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_slug_taken() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&note("same", 1)).await.expect("Failed to create");

        let err = repo.create(&note("same", 2)).await.unwrap_err();

        assert!(is_slug_taken(&err));
    }

    #[tokio::test]
    async fn test_update_into_taken_slug_is_slug_taken() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&note("first", 1)).await.expect("Failed to create");
        let mut second = repo.create(&note("second", 1)).await.expect("Failed to create");

        second.slug = "first".to_string();
        let err = repo.update(&second).await.unwrap_err();

        assert!(is_slug_taken(&err));
        assert!(repo.get_by_slug("second").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_list_by_author_only_returns_own_notes() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&note("a1", 1)).await.unwrap();
        repo.create(&note("b1", 2)).await.unwrap();
        repo.create(&note("a2", 1)).await.unwrap();

        let slugs: Vec<String> = repo
            .list_by_author(1)
            .await
            .expect("Query failed")
            .into_iter()
            .map(|n| n.slug)
            .collect();

        assert_eq!(slugs, vec!["a1", "a2"]);
    }

    #[tokio::test]
    async fn test_slug_exists_excludes_self() {
        let (_pool, repo) = setup_test_repo().await;
        let created = repo.create(&note("mine", 1)).await.unwrap();

        assert!(repo.slug_exists("mine", None).await.unwrap());
        assert!(!repo.slug_exists("mine", Some(created.id)).await.unwrap());
        assert!(!repo.slug_exists("other", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_note() {
        let (_pool, repo) = setup_test_repo().await;
        let created = repo.create(&note("gone", 1)).await.unwrap();

        repo.delete(created.id).await.expect("Failed to delete");

        assert!(repo.get_by_slug("gone").await.unwrap().is_none());
    }
}
