//! Ownership gate
//!
//! Notes and comments are visible and changeable only by their author.
//! Anyone else gets the same answer as for a resource that does not exist,
//! so the existence of other users' notes never leaks. Anonymous callers
//! are stopped before the ownership check even runs.

use crate::models::{Actor, Owned};

/// What the actor intends to do with the resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
    Edit,
    Delete,
}

/// Why access was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    /// Absent, or owned by somebody else. Callers cannot tell which.
    #[error("not found")]
    NotFound,

    /// Anonymous actor; must log in first
    #[error("authentication required")]
    AuthenticationRequired,
}

/// The ownership predicate itself.
///
/// Every action currently follows the same rule: only the owner passes.
pub fn can_access<R: Owned + ?Sized>(resource: &R, actor: Actor, _action: Action) -> bool {
    actor.user_id() == Some(resource.owner_id())
}

/// Gate a looked-up resource.
///
/// `resource` is whatever the lookup found. Anonymous actors get
/// [`AccessError::AuthenticationRequired`] regardless of the lookup result;
/// an absent resource and a foreign one both become [`AccessError::NotFound`].
pub fn authorize<R: Owned>(
    resource: Option<R>,
    actor: Actor,
    action: Action,
) -> Result<R, AccessError> {
    if !actor.is_authenticated() {
        return Err(AccessError::AuthenticationRequired);
    }

    match resource {
        Some(resource) if can_access(&resource, actor, action) => Ok(resource),
        Some(_) => {
            tracing::debug!(?actor, ?action, "Refusing access to a foreign resource");
            Err(AccessError::NotFound)
        }
        None => Err(AccessError::NotFound),
    }
}
