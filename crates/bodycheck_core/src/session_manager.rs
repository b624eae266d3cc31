//! crates/bodycheck_core/src/session_manager.rs
//!
//! The Session Manager owns the single active session. It evaluates logins
//! against the Account Store, creates accounts on signup, and persists the
//! active session so a reload does not sign the user out.
//!
//! Every operation takes an internal lock for its whole duration, so store
//! interactions never interleave even on a multi-threaded runtime.

use crate::account_store::{scalar_text, AccountMatch, AccountOrigin, AccountStore};
use crate::domain::{
    email_local_part, AccountId, InternalAccount, LoginEvent, LoginOutcome, PublicAccount, Role,
    SessionSnapshot,
};
use crate::keys::{LEGACY_SESSION_KEYS, SESSION_KEY};
use crate::ports::{AuthError, AuthResult, KeyValueStore, StorageError, StorageResult};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

pub struct SessionManager {
    accounts: AccountStore,
    storage: Arc<dyn KeyValueStore>,
    current: watch::Sender<SessionSnapshot>,
    op_lock: Mutex<()>,
}

impl SessionManager {
    /// Creates a manager over `storage`, restoring any persisted session.
    pub async fn restore(storage: Arc<dyn KeyValueStore>) -> Self {
        let accounts = AccountStore::new(storage.clone());
        Self::restore_with(storage, accounts).await
    }

    /// Like [`SessionManager::restore`], with an explicit Account Store.
    pub async fn restore_with(storage: Arc<dyn KeyValueStore>, accounts: AccountStore) -> Self {
        let snapshot = match read_session_record(storage.as_ref()).await {
            Ok(Some(account)) => {
                info!(account_id = %account.id, role = %account.role, "Restored persisted session");
                SessionSnapshot::signed_in(account)
            }
            Ok(None) => SessionSnapshot::signed_out(),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable session record");
                SessionSnapshot::signed_out()
            }
        };

        let (current, _) = watch::channel(snapshot);
        Self {
            accounts,
            storage,
            current,
            op_lock: Mutex::new(()),
        }
    }

    //=====================================================================================
    // Operations
    //=====================================================================================

    /// Signs in with `(email, role)` and `credential`.
    ///
    /// A self-registered `user` account stored before credentials were tracked
    /// adopts the supplied credential on its first login. Every attempt,
    /// successful or not, lands in the Account Store's login log.
    pub async fn login(&self, email: &str, credential: &str, role: Role) -> AuthResult<PublicAccount> {
        let _op = self.op_lock.lock().await;

        let result = self.authenticate(email, credential, role).await;
        let (account_id, outcome) = match &result {
            Ok(account) => (Some(account.id.clone()), LoginOutcome::Success),
            Err(AuthError::AccountNotFound) => (None, LoginOutcome::AccountNotFound),
            Err(_) => (None, LoginOutcome::InvalidCredentials),
        };
        self.accounts
            .record_login(&LoginEvent::now(account_id, email, role, outcome))
            .await;

        let public = result?;
        self.establish(&public).await;
        info!(account_id = %public.id, role = %public.role, "Signed in");
        Ok(public)
    }

    /// Registers a new self-service account and signs it in.
    ///
    /// A blank `name` defaults to the local part of `email`.
    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        credential: &str,
        role: Role,
    ) -> AuthResult<PublicAccount> {
        if !role.is_self_service() {
            info!(role = %role, "Signup rejected: role is not self-service");
            return Err(AuthError::SignupRoleNotAllowed { role });
        }

        let _op = self.op_lock.lock().await;

        if self.accounts.exists(email, role).await {
            info!(role = %role, "Signup rejected: account already exists");
            return Err(AuthError::AccountAlreadyExists);
        }

        // Whitespace only decides blankness; a supplied name is kept as typed.
        let name = if name.trim().is_empty() {
            email_local_part(email)
        } else {
            name
        };
        let account = InternalAccount {
            id: AccountId::fresh(),
            name: name.to_string(),
            email: email.to_string(),
            role: Role::SELF_SERVICE,
            credential: credential.to_string(),
        };
        self.accounts.append(&account).await;

        let public = account.to_public();
        self.establish(&public).await;
        info!(account_id = %public.id, "Signed up and signed in");
        Ok(public)
    }

    /// Ends the session and clears every session key from the durable medium.
    pub async fn logout(&self) {
        let _op = self.op_lock.lock().await;

        self.current.send_replace(SessionSnapshot::signed_out());
        for key in std::iter::once(SESSION_KEY).chain(LEGACY_SESSION_KEYS) {
            if let Err(e) = self.storage.remove(key).await {
                warn!(key, error = %e, "Failed to clear session key");
            }
        }
        info!("Signed out");
    }

    /// The active session. Pure read; no storage access.
    pub fn current_session(&self) -> SessionSnapshot {
        self.current.borrow().clone()
    }

    /// A receiver that observes every session transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.current.subscribe()
    }

    pub fn accounts(&self) -> &AccountStore {
        &self.accounts
    }

    //=====================================================================================
    // Helpers
    //=====================================================================================

    async fn authenticate(
        &self,
        email: &str,
        credential: &str,
        role: Role,
    ) -> AuthResult<PublicAccount> {
        let Some(AccountMatch { mut account, origin }) = self.accounts.find(email, role).await
        else {
            info!(role = %role, "Login rejected: no matching account");
            return Err(AuthError::AccountNotFound);
        };

        if origin == AccountOrigin::Dynamic
            && account.role == Role::User
            && account.credential.is_empty()
        {
            self.accounts.migrate_credential(email, role, credential).await;
            account.credential = credential.to_string();
        }

        if account.credential != credential {
            info!(account_id = %account.id, "Login rejected: credential mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(account.to_public())
    }

    async fn establish(&self, account: &PublicAccount) {
        self.current
            .send_replace(SessionSnapshot::signed_in(account.clone()));
        if let Err(e) = write_session_record(self.storage.as_ref(), account).await {
            warn!(error = %e, "Failed to persist session; it will not survive a reload");
        }
    }
}

//=========================================================================================
// Session record persistence
//=========================================================================================

async fn write_session_record(
    storage: &dyn KeyValueStore,
    account: &PublicAccount,
) -> StorageResult<()> {
    let raw = serde_json::to_string(account).map_err(|e| session_corrupt(e.to_string()))?;
    storage.set(SESSION_KEY, &raw).await
}

async fn read_session_record(storage: &dyn KeyValueStore) -> StorageResult<Option<PublicAccount>> {
    match storage.get(SESSION_KEY).await? {
        Some(raw) if !raw.trim().is_empty() => parse_session_record(&raw).map(Some),
        _ => Ok(None),
    }
}

/// Parses a persisted session. `email` and a known `role` are required;
/// the display name is repaired when older builds stored it badly.
fn parse_session_record(raw: &str) -> StorageResult<PublicAccount> {
    let value: Value = serde_json::from_str(raw).map_err(|e| session_corrupt(e.to_string()))?;
    let record = value
        .as_object()
        .ok_or_else(|| session_corrupt("expected an object"))?;

    let email = record
        .get("email")
        .and_then(Value::as_str)
        .ok_or_else(|| session_corrupt("missing email"))?
        .to_string();
    let role = record
        .get("role")
        .and_then(Value::as_str)
        .and_then(Role::from_tag)
        .ok_or_else(|| session_corrupt("missing or unknown role"))?;
    let id = record
        .get("id")
        .and_then(scalar_text)
        .map(AccountId::new)
        .unwrap_or_else(|| AccountId::new(""));
    let name = repair_name(record.get("name"), &email);

    Ok(PublicAccount {
        id,
        name,
        email,
        role,
    })
}

fn repair_name(stored: Option<&Value>, email: &str) -> String {
    if let Some(Value::String(name)) = stored {
        if !name.is_empty() {
            return name.clone();
        }
    }

    // Some builds stored the whole profile object under `name`.
    ["full_name", "fullName", "name", "Full Name"]
        .iter()
        .filter_map(|field| stored?.get(*field)?.as_str())
        .map(str::trim)
        .find(|candidate| !candidate.is_empty())
        .unwrap_or_else(|| email_local_part(email))
        .to_string()
}

fn session_corrupt(reason: impl Into<String>) -> StorageError {
    StorageError::Corrupt {
        key: SESSION_KEY.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn session_record_requires_email_and_known_role() {
        assert!(parse_session_record(r#"{"id":"1","name":"A","email":"a@x","role":"admin"}"#).is_ok());
        assert!(parse_session_record(r#"{"id":"1","name":"A","role":"admin"}"#).is_err());
        assert!(parse_session_record(r#"{"id":"1","name":"A","email":"a@x","role":"root"}"#).is_err());
        assert!(parse_session_record("[]").is_err());
        assert!(parse_session_record("{oops").is_err());
    }

    #[test]
    fn physician_sessions_restore_as_provider() {
        let account =
            parse_session_record(r#"{"id":2,"name":"Dr. C","email":"c@x","role":"physician"}"#)
                .unwrap();
        assert_eq!(account.role, Role::Provider);
        assert_eq!(account.id.as_str(), "2");
    }

    #[test]
    fn name_repair_prefers_nested_profile_fields() {
        let nested = json!({ "full_name": "  Grace Hopper  " });
        assert_eq!(repair_name(Some(&nested), "g@x.com"), "Grace Hopper");

        let camel = json!({ "fullName": "", "Full Name": "Ada" });
        assert_eq!(repair_name(Some(&camel), "a@x.com"), "Ada");
    }

    #[test]
    fn name_repair_falls_back_to_email_local_part() {
        assert_eq!(repair_name(None, "bob@y.com"), "bob");
        assert_eq!(repair_name(Some(&json!("")), "bob@y.com"), "bob");
        assert_eq!(repair_name(Some(&json!(17)), "bob@y.com"), "bob");
        assert_eq!(repair_name(Some(&json!("Bob")), "bob@y.com"), "Bob");
    }
}
