//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories. They own
//! validation, the ownership gate and comment moderation; handlers only
//! translate their errors into responses.

pub mod access;
pub mod comment;
pub mod moderation;
pub mod news;
pub mod note;
pub mod password;
pub mod slug;
pub mod user;

pub use access::{authorize, can_access, AccessError, Action};
pub use comment::{CommentService, CommentServiceError};
pub use moderation::{ModerationFilter, Rejected};
pub use news::{NewsService, NewsServiceError};
pub use note::{NoteService, NoteServiceError};
pub use password::{hash_password, verify_password};
pub use slug::{is_valid_slug, slugify};
pub use user::{UserService, UserServiceError};
