//! Capability checks evaluated before any mutation.

use crate::actor::Actor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
    Create,
    Update,
    Delete,
}

impl Action {
    pub fn is_safe(self) -> bool {
        matches!(self, Action::View)
    }
}

/// Reads are open to everyone; mutations need the resource's author or staff.
pub fn author_or_admin_or_read_only(actor: &Actor, author_id: i32, action: Action) -> bool {
    if action.is_safe() {
        return true;
    }
    match actor {
        Actor::Anonymous => false,
        Actor::User { id, is_staff } => *is_staff || *id == author_id,
    }
}

/// Reads are open to everyone; mutations need staff.
pub fn admin_or_read_only(actor: &Actor, action: Action) -> bool {
    action.is_safe() || actor.is_staff()
}
