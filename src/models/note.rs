//! Note model

use serde::{Deserialize, Serialize};

/// A private note. Only its author ever sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub text: String,
    /// URL token, unique across all notes
    pub slug: String,
    pub author_id: i64,
}

/// Note form as submitted on `/add/` and `/edit/{slug}/`.
///
/// An empty `slug` means "derive it from the title".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoteInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub slug: Option<String>,
}

impl NoteInput {
    /// The explicitly supplied slug, if any non-blank one was given.
    pub fn supplied_slug(&self) -> Option<&str> {
        self.slug
            .as_deref()
            .map(str::trim)
            .filter(|slug| !slug.is_empty())
    }
}

impl From<&Note> for NoteInput {
    fn from(note: &Note) -> Self {
        Self {
            title: note.title.clone(),
            text: note.text.clone(),
            slug: Some(note.slug.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_slug_is_not_supplied() {
        let mut input = NoteInput {
            title: "t".into(),
            text: "x".into(),
            slug: Some("   ".into()),
        };
        assert_eq!(input.supplied_slug(), None);

        input.slug = None;
        assert_eq!(input.supplied_slug(), None);

        input.slug = Some(" my-slug ".into());
        assert_eq!(input.supplied_slug(), Some("my-slug"));
    }
}
