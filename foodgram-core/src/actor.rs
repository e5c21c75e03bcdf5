use crate::error::CoreError;
use crate::models::User;

/// Identity on whose behalf an operation runs. Resolved by the caller; the
/// core never looks at credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Anonymous,
    User { id: i32, is_staff: bool },
}

impl Actor {
    pub fn user(id: i32) -> Self {
        Actor::User {
            id,
            is_staff: false,
        }
    }

    pub fn staff(id: i32) -> Self {
        Actor::User { id, is_staff: true }
    }

    pub fn user_id(&self) -> Option<i32> {
        match self {
            Actor::Anonymous => None,
            Actor::User { id, .. } => Some(*id),
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, Actor::User { is_staff: true, .. })
    }

    /// The authenticated user id, or a permission error for anonymous actors.
    pub fn require_user(&self) -> Result<i32, CoreError> {
        self.user_id().ok_or_else(CoreError::authentication_required)
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Actor::User {
            id: user.id,
            is_staff: user.is_staff,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_has_no_user_id() {
        assert_eq!(Actor::Anonymous.user_id(), None);
        assert!(matches!(
            Actor::Anonymous.require_user(),
            Err(CoreError::Permission(_))
        ));
    }

    #[test]
    fn staff_flag_is_carried() {
        assert!(Actor::staff(1).is_staff());
        assert!(!Actor::user(1).is_staff());
        assert_eq!(Actor::user(7).require_user(), Ok(7));
    }
}
