//! Self-ownership authorization.
//!
//! A caller may act on a resource only when it owns it. There are no roles
//! and no bypass; routes that expose cross-user data make that call
//! themselves, outside this check.

use super::Identity;
use crate::error::{AppError, AuthError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allowed
    }

    /// `Denied` becomes [`AuthError::Denied`], for use with `?`.
    pub fn into_result(self) -> crate::Result<()> {
        match self {
            Decision::Allowed => Ok(()),
            Decision::Denied => Err(AppError::Auth(AuthError::Denied)),
        }
    }
}

/// `Allowed` iff the caller and the owner are the same identity.
pub fn authorize(caller: &Identity, owner: &Identity) -> Decision {
    if caller == owner {
        Decision::Allowed
    } else {
        Decision::Denied
    }
}
