//! crates/bodycheck_core/src/guard.rs
//!
//! Access checks that page collaborators run against the current session
//! before rendering protected content.

use crate::domain::{PublicAccount, Role, SessionSnapshot};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("Sign in to continue")]
    NotAuthenticated,
    #[error("The {role} role cannot access this page")]
    RoleNotPermitted { role: Role },
}

impl SessionSnapshot {
    /// The signed-in account, or `NotAuthenticated`.
    pub fn require_authenticated(&self) -> Result<&PublicAccount, AccessError> {
        match &self.account {
            Some(account) if self.authenticated => Ok(account),
            _ => Err(AccessError::NotAuthenticated),
        }
    }

    /// The signed-in account if its role is one of `allowed`.
    pub fn require_role(&self, allowed: &[Role]) -> Result<&PublicAccount, AccessError> {
        let account = self.require_authenticated()?;
        if allowed.contains(&account.role) {
            Ok(account)
        } else {
            Err(AccessError::RoleNotPermitted { role: account.role })
        }
    }
}
