//! Ownership of user-authored resources

use super::{Comment, Note};

/// A resource that belongs to exactly one user.
pub trait Owned {
    /// ID of the user who owns this resource
    fn owner_id(&self) -> i64;
}

impl Owned for Note {
    fn owner_id(&self) -> i64 {
        self.author_id
    }
}

impl Owned for Comment {
    fn owner_id(&self) -> i64 {
        self.author_id
    }
}

/// Who is making a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Anonymous,
    User(i64),
}

impl Actor {
    pub fn user_id(self) -> Option<i64> {
        match self {
            Actor::Anonymous => None,
            Actor::User(id) => Some(id),
        }
    }

    pub fn is_authenticated(self) -> bool {
        matches!(self, Actor::User(_))
    }
}

impl From<Option<i64>> for Actor {
    fn from(user_id: Option<i64>) -> Self {
        user_id.map_or(Actor::Anonymous, Actor::User)
    }
}
