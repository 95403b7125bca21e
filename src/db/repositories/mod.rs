//! Database repositories
//!
//! One repository per entity, each a trait plus an SQLx implementation that
//! dispatches on the configured driver.

pub mod comment;
pub mod news;
pub mod note;
pub mod session;
pub mod user;

pub use comment::{CommentRepository, SqlxCommentRepository};
pub use news::{NewsRepository, SqlxNewsRepository};
pub use note::{is_slug_taken, NoteRepository, SlugTaken, SqlxNoteRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};
