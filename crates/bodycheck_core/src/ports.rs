//! crates/bodycheck_core/src/ports.rs
//!
//! Defines the service contracts (traits) and error types at the edge of the core.
//! The durable medium is reached only through `KeyValueStore`, so the core stays
//! independent of where the bytes actually live.

use crate::domain::Role;
use async_trait::async_trait;

//=========================================================================================
// Storage Error and Result Types
//=========================================================================================

/// Errors raised by the durable key-value medium.
///
/// These never reach callers of the Session Manager; the core collapses them to
/// "empty" or "absent" at its boundary.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage is unavailable: {0}")]
    Unavailable(String),
    #[error("Stored value under '{key}' is corrupt: {reason}")]
    Corrupt { key: String, reason: String },
    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience type alias for `Result<T, StorageError>`.
pub type StorageResult<T> = Result<T, StorageError>;

//=========================================================================================
// Authentication Error and Result Types
//=========================================================================================

/// The failures a login or signup attempt can report back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("No account exists for this email and role")]
    AccountNotFound,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Sign up is available only for User accounts; {role} access is provisioned by an administrator")]
    SignupRoleNotAllowed { role: Role },
    #[error("Account already exists for this email and role")]
    AccountAlreadyExists,
}

impl AuthError {
    /// A stable machine-readable code for UI collaborators.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::AccountNotFound => "USER_NOT_FOUND",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::SignupRoleNotAllowed { .. } => "SIGNUP_ROLE_NOT_ALLOWED",
            AuthError::AccountAlreadyExists => "ACCOUNT_ALREADY_EXISTS",
        }
    }
}

/// A convenience type alias for `Result<T, AuthError>`.
pub type AuthResult<T> = Result<T, AuthError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// A string-keyed, string-valued durable medium (browser local storage or a stand-in).
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the value under `key`, or `None` when the key is absent.
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Replaces the value under `key`.
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Deletes `key`. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> StorageResult<()>;
}
