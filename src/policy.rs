use crate::entity::user;
use crate::error::AccountError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied,
}

impl Decision {
    fn when(allowed: bool) -> Self {
        if allowed {
            Self::Allowed
        } else {
            Self::Denied
        }
    }

    pub fn is_allowed(self) -> bool {
        self == Self::Allowed
    }

    /// `Denied` becomes [`AccountError::Forbidden`].
    pub fn authorize(self) -> Result<(), AccountError> {
        match self {
            Self::Allowed => Ok(()),
            Self::Denied => Err(AccountError::Forbidden),
        }
    }
}

/// Who may mutate a user record. Users may only edit or delete themselves;
/// there is no administrative override.
pub struct UserPolicy;

impl UserPolicy {
    pub fn can_update(acting_user_id: i32, target: &user::Model) -> Decision {
        Decision::when(acting_user_id == target.id)
    }

    pub fn can_destroy(acting_user_id: i32, target: &user::Model) -> Decision {
        Decision::when(acting_user_id == target.id)
    }
}
