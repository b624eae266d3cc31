//! crates/bodycheck_core/src/domain.rs
//!
//! Defines the pure, core data structures for the session and account system.
//! Persisted shapes live next to the types that own them; everything here is
//! plain data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

//=========================================================================================
// Roles
//=========================================================================================

/// The closed set of role tags an account can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    /// Older screens call this role `physician`.
    #[serde(alias = "physician")]
    Provider,
    Nurse,
    User,
}

impl Role {
    /// The only role that may be created through self-service signup.
    pub const SELF_SERVICE: Role = Role::User;

    /// Applied to persisted records whose role is missing or unrecognised.
    pub const FALLBACK: Role = Role::User;

    pub const ALL: [Role; 4] = [Role::Admin, Role::Provider, Role::Nurse, Role::User];

    /// Parses a stored role tag. Unknown tags yield `None`.
    pub fn from_tag(tag: &str) -> Option<Role> {
        match tag {
            "admin" => Some(Role::Admin),
            "provider" | "physician" => Some(Role::Provider),
            "nurse" => Some(Role::Nurse),
            "user" => Some(Role::User),
            _ => None,
        }
    }

    /// Parses a role tag, falling back to [`Role::FALLBACK`].
    pub fn from_tag_or_fallback(tag: Option<&str>) -> Role {
        tag.and_then(Role::from_tag).unwrap_or(Role::FALLBACK)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Provider => "provider",
            Role::Nurse => "nurse",
            Role::User => "user",
        }
    }

    pub fn is_self_service(&self) -> bool {
        *self == Role::SELF_SERVICE
    }

    /// Whether this role may edit report care status on the dashboard.
    pub fn can_edit_reports(&self) -> bool {
        matches!(self, Role::Admin | Role::Provider)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//=========================================================================================
// Accounts
//=========================================================================================

/// Opaque account identifier. Only uniqueness matters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A new id for a self-registered account.
    pub fn fresh() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Stand-in for a legacy record stored without an id.
    pub fn placeholder(index: usize) -> Self {
        Self(format!("dyn-{}", index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The account as the store sees it, credential included.
///
/// The credential is persisted under the `password` field so existing
/// dynamic tables keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalAccount {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(rename = "password")]
    pub credential: String,
}

impl InternalAccount {
    /// Strips the credential for use outside the core.
    pub fn to_public(&self) -> PublicAccount {
        PublicAccount {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }

    pub fn matches(&self, email: &str, role: Role) -> bool {
        self.email == email && self.role == role
    }
}

/// The account exposed to the rest of the application. Never carries a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicAccount {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Returns everything before the first `@`, or the whole string when there is none.
pub fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

//=========================================================================================
// Login history
//=========================================================================================

/// How a login attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginOutcome {
    Success,
    AccountNotFound,
    InvalidCredentials,
}

impl LoginOutcome {
    pub fn is_success(&self) -> bool {
        *self == LoginOutcome::Success
    }
}

/// One recorded login attempt, successful or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginEvent {
    /// Set only when the attempt signed someone in.
    pub account_id: Option<AccountId>,
    pub email: String,
    pub role: Role,
    pub outcome: LoginOutcome,
    pub login_at: DateTime<Utc>,
}

impl LoginEvent {
    pub fn now(
        account_id: Option<AccountId>,
        email: &str,
        role: Role,
        outcome: LoginOutcome,
    ) -> Self {
        Self {
            account_id,
            email: email.to_string(),
            role,
            outcome,
            login_at: Utc::now(),
        }
    }
}

//=========================================================================================
// Session
//=========================================================================================

/// Read-only view of the active session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub account: Option<PublicAccount>,
    pub authenticated: bool,
}

impl SessionSnapshot {
    pub fn signed_in(account: PublicAccount) -> Self {
        Self {
            account: Some(account),
            authenticated: true,
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn physician_is_an_alias_for_provider() {
        assert_eq!(Role::from_tag("physician"), Some(Role::Provider));
        let role: Role = serde_json::from_str("\"physician\"").unwrap();
        assert_eq!(role, Role::Provider);
        assert_eq!(serde_json::to_string(&role).unwrap(), "\"provider\"");
    }

    #[test]
    fn unknown_or_missing_tags_fall_back_to_user() {
        assert_eq!(Role::from_tag_or_fallback(Some("superuser")), Role::User);
        assert_eq!(Role::from_tag_or_fallback(None), Role::User);
        assert_eq!(Role::from_tag_or_fallback(Some("nurse")), Role::Nurse);
    }

    #[test]
    fn only_user_is_self_service() {
        let eligible: Vec<Role> = Role::ALL.into_iter().filter(Role::is_self_service).collect();
        assert_eq!(eligible, vec![Role::User]);
    }

    #[test]
    fn local_part_of_email() {
        assert_eq!(email_local_part("bob@y.com"), "bob");
        assert_eq!(email_local_part("no-at-sign"), "no-at-sign");
        assert_eq!(email_local_part("@y.com"), "");
    }

    #[test]
    fn credential_is_stored_as_password_and_dropped_from_public() {
        let account = InternalAccount {
            id: AccountId::new("7"),
            name: "Alice".to_string(),
            email: "a@x.com".to_string(),
            role: Role::User,
            credential: "pw1".to_string(),
        };
        let stored = serde_json::to_value(&account).unwrap();
        assert_eq!(stored["password"], "pw1");

        let public = serde_json::to_value(account.to_public()).unwrap();
        assert!(public.get("password").is_none());
        assert!(public.get("credential").is_none());
        assert_eq!(public["role"], "user");
    }
}
