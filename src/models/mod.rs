//! Data models
//!
//! Database entities for both applications plus the form inputs that
//! create or change them:
//! - Notes app: `Note`, owned by a `User`
//! - News app: `News` and its `Comment`s
//! - Authentication: `User`, `Session`

mod comment;
mod news;
mod note;
mod ownership;
mod session;
mod user;

pub use comment::{Comment, CommentInput, CommentWithAuthor};
pub use news::{News, NewsInput};
pub use note::{Note, NoteInput};
pub use ownership::{Actor, Owned};
pub use session::Session;
pub use user::{SignupInput, User};
