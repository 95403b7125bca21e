//! Note service
//!
//! Private notes: every read and write goes through the ownership gate,
//! so a note is only ever seen by its author.

use crate::db::repositories::{is_slug_taken, NoteRepository};
use crate::models::{Actor, Note, NoteInput};
use crate::services::access::{authorize, AccessError, Action};
use crate::services::slug::{is_valid_slug, slugify, MAX_SLUG_LENGTH};
use anyhow::Context;
use std::sync::Arc;

/// Longest accepted note title
pub const MAX_TITLE_LENGTH: usize = 100;

/// Appended to a slug that another note already uses
pub const SLUG_TAKEN_WARNING: &str =
    " - такой slug уже существует, придумайте уникальное значение!";

const REQUIRED: &str = "Обязательное поле.";

/// Error types for note service operations
#[derive(Debug, thiserror::Error)]
pub enum NoteServiceError {
    /// Absent, or not the actor's note
    #[error("Note not found")]
    NotFound,

    #[error("Authentication required")]
    AuthenticationRequired,

    /// A form field failed validation; nothing was written
    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<AccessError> for NoteServiceError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::NotFound => NoteServiceError::NotFound,
            AccessError::AuthenticationRequired => NoteServiceError::AuthenticationRequired,
        }
    }
}

fn validation(field: &'static str, message: impl Into<String>) -> NoteServiceError {
    NoteServiceError::Validation {
        field,
        message: message.into(),
    }
}

fn slug_taken(slug: &str) -> NoteServiceError {
    validation("slug", format!("{}{}", slug, SLUG_TAKEN_WARNING))
}

/// Note service
pub struct NoteService {
    repo: Arc<dyn NoteRepository>,
}

impl NoteService {
    pub fn new(repo: Arc<dyn NoteRepository>) -> Self {
        Self { repo }
    }

    /// The actor's own notes; other users' notes never appear.
    pub async fn list_for(&self, actor: Actor) -> Result<Vec<Note>, NoteServiceError> {
        let author_id = actor
            .user_id()
            .ok_or(NoteServiceError::AuthenticationRequired)?;
        let notes = self
            .repo
            .list_by_author(author_id)
            .await
            .context("Failed to list notes")?;
        Ok(notes)
    }

    /// Look up a note for `action` on behalf of `actor`.
    pub async fn get(
        &self,
        slug: &str,
        actor: Actor,
        action: Action,
    ) -> Result<Note, NoteServiceError> {
        if !actor.is_authenticated() {
            return Err(NoteServiceError::AuthenticationRequired);
        }
        let note = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to get note")?;
        Ok(authorize(note, actor, action)?)
    }

    /// Create a note owned by the actor.
    pub async fn create(&self, input: &NoteInput, actor: Actor) -> Result<Note, NoteServiceError> {
        let author_id = actor
            .user_id()
            .ok_or(NoteServiceError::AuthenticationRequired)?;
        let (title, text, slug) = self.clean(input, None).await?;

        let note = Note {
            id: 0,
            title,
            text,
            slug,
            author_id,
        };
        let created = self.repo.create(&note).await.map_err(|e| {
            if is_slug_taken(&e) {
                slug_taken(&note.slug)
            } else {
                NoteServiceError::Internal(e)
            }
        })?;

        tracing::info!(note_id = created.id, slug = %created.slug, "Note created");
        Ok(created)
    }

    /// Replace title, text and slug of one of the actor's notes.
    pub async fn update(
        &self,
        slug: &str,
        input: &NoteInput,
        actor: Actor,
    ) -> Result<Note, NoteServiceError> {
        let existing = self.get(slug, actor, Action::Edit).await?;
        let (title, text, slug) = self.clean(input, Some(existing.id)).await?;

        let note = Note {
            title,
            text,
            slug,
            ..existing
        };
        let updated = self.repo.update(&note).await.map_err(|e| {
            if is_slug_taken(&e) {
                slug_taken(&note.slug)
            } else {
                NoteServiceError::Internal(e)
            }
        })?;

        tracing::info!(note_id = updated.id, slug = %updated.slug, "Note updated");
        Ok(updated)
    }

    /// Delete one of the actor's notes.
    pub async fn delete(&self, slug: &str, actor: Actor) -> Result<(), NoteServiceError> {
        let note = self.get(slug, actor, Action::Delete).await?;
        self.repo
            .delete(note.id)
            .await
            .context("Failed to delete note")?;

        tracing::info!(note_id = note.id, "Note deleted");
        Ok(())
    }

    /// Validate the form and settle the final slug.
    ///
    /// Returns trimmed `(title, text, slug)`. `exclude_id` is the note being
    /// edited, which may keep its own slug.
    async fn clean(
        &self,
        input: &NoteInput,
        exclude_id: Option<i64>,
    ) -> Result<(String, String, String), NoteServiceError> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(validation("title", REQUIRED));
        }
        if title.chars().count() > MAX_TITLE_LENGTH {
            return Err(validation(
                "title",
                format!("Не более {} символов.", MAX_TITLE_LENGTH),
            ));
        }
        if input.text.trim().is_empty() {
            return Err(validation("text", REQUIRED));
        }

        let slug = match input.supplied_slug() {
            Some(slug) if !is_valid_slug(slug) => {
                return Err(validation(
                    "slug",
                    format!(
                        "Допустимы латинские буквы, цифры, \"_\" и \"-\", не более {} символов.",
                        MAX_SLUG_LENGTH
                    ),
                ));
            }
            Some(slug) => slug.to_string(),
            None => {
                let derived = slugify(title);
                if derived.is_empty() {
                    return Err(validation(
                        "slug",
                        "Не удалось получить slug из заголовка, укажите его вручную.",
                    ));
                }
                derived
            }
        };

        if self
            .repo
            .slug_exists(&slug, exclude_id)
            .await
            .context("Failed to check slug")?
        {
            tracing::debug!(%slug, "Slug already taken");
            return Err(slug_taken(&slug));
        }

        Ok((title.to_string(), input.text.clone(), slug))
    }
}
