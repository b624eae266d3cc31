//! crates/bodycheck_core/src/account_store.rs
//!
//! The Account Store combines the fixed seed accounts with the self-registered
//! accounts kept in the durable medium, and owns all writes to the latter.
//!
//! The dynamic table is untyped persisted data. It is read as raw JSON and every
//! record goes through `coerce_record`, so legacy or half-written entries never
//! break a lookup. Storage failures are logged and collapsed here; nothing above
//! this module sees a `StorageError`.

use crate::domain::{AccountId, InternalAccount, LoginEvent, Role};
use crate::keys::{DYNAMIC_ACCOUNTS_KEY, LOGIN_EVENTS_KEY};
use crate::ports::{KeyValueStore, StorageError, StorageResult};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Oldest login events are dropped once the log holds this many.
pub const LOGIN_EVENT_CAP: usize = 200;

/// Credential shared by every seed account.
pub const SEED_CREDENTIAL: &str = "demo";

/// The built-in accounts that make the demo navigable without signing up.
pub fn seed_accounts() -> Vec<InternalAccount> {
    [
        ("1", "Dr. Sarah Johnson", "admin@bodycheck", Role::Admin),
        ("2", "Dr. Michael Chen", "provider@bodycheck", Role::Provider),
        ("3", "Nurse Patricia Williams", "nurse@bodycheck", Role::Nurse),
        ("4", "John Doe", "user@bodycheck", Role::User),
    ]
    .into_iter()
    .map(|(id, name, email, role)| InternalAccount {
        id: AccountId::new(id),
        name: name.to_string(),
        email: email.to_string(),
        role,
        credential: SEED_CREDENTIAL.to_string(),
    })
    .collect()
}

/// Which table a looked-up account came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountOrigin {
    Seed,
    Dynamic,
}

#[derive(Debug, Clone)]
pub struct AccountMatch {
    pub account: InternalAccount,
    pub origin: AccountOrigin,
}

//=========================================================================================
// The Account Store
//=========================================================================================

#[derive(Clone)]
pub struct AccountStore {
    storage: Arc<dyn KeyValueStore>,
    seeds: Arc<[InternalAccount]>,
}

impl AccountStore {
    /// Creates a store over `storage` with the standard seed accounts.
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self::with_seeds(storage, seed_accounts())
    }

    pub fn with_seeds(storage: Arc<dyn KeyValueStore>, seeds: Vec<InternalAccount>) -> Self {
        Self {
            storage,
            seeds: seeds.into(),
        }
    }

    /// Every known account: seeds first, then dynamic accounts in insertion order.
    ///
    /// An unreadable dynamic table counts as empty; the seeds are always returned.
    pub async fn list_all(&self) -> Vec<InternalAccount> {
        let mut accounts = self.seeds.to_vec();
        accounts.extend(self.dynamic_accounts().await);
        accounts
    }

    /// The first account matching `(email, role)` in `list_all` order.
    pub async fn find(&self, email: &str, role: Role) -> Option<AccountMatch> {
        let seed_count = self.seeds.len();
        self.list_all()
            .await
            .into_iter()
            .enumerate()
            .find(|(_, account)| account.matches(email, role))
            .map(|(index, account)| AccountMatch {
                account,
                origin: if index < seed_count {
                    AccountOrigin::Seed
                } else {
                    AccountOrigin::Dynamic
                },
            })
    }

    pub async fn exists(&self, email: &str, role: Role) -> bool {
        self.find(email, role).await.is_some()
    }

    /// Appends `account` to the dynamic table. Failures are logged, not returned.
    pub async fn append(&self, account: &InternalAccount) {
        match self.try_append(account).await {
            Ok(()) => info!(account_id = %account.id, role = %account.role, "Stored new account"),
            Err(e) => warn!(
                account_id = %account.id,
                error = %e,
                "Failed to persist new account; it will not survive a reload"
            ),
        }
    }

    /// Gives the first credential-less dynamic record for `(email, role)` the
    /// supplied credential. Failures are logged, not returned.
    pub async fn migrate_credential(&self, email: &str, role: Role, new_credential: &str) {
        match self.try_migrate_credential(email, role, new_credential).await {
            Ok(true) => info!(role = %role, "Adopted credential for legacy account"),
            Ok(false) => debug!(role = %role, "No legacy account needed a credential"),
            Err(e) => warn!(role = %role, error = %e, "Failed to persist migrated credential"),
        }
    }

    /// Adds `event` to the login log, trimming it to [`LOGIN_EVENT_CAP`].
    /// Failures are logged, not returned.
    pub async fn record_login(&self, event: &LoginEvent) {
        if let Err(e) = self.try_record_login(event).await {
            warn!(outcome = ?event.outcome, error = %e, "Failed to record login event");
        }
    }

    /// Up to `limit` login events, newest first. An unreadable log counts as empty.
    pub async fn recent_login_events(&self, limit: usize) -> Vec<LoginEvent> {
        match self.read_login_log().await {
            Ok(log) => log
                .into_iter()
                .rev()
                // Entries that no longer parse are skipped, not fatal.
                .filter_map(|raw| serde_json::from_value(raw).ok())
                .take(limit)
                .collect(),
            Err(e) => {
                warn!(error = %e, "Login event log unreadable");
                Vec::new()
            }
        }
    }

    //=====================================================================================
    // Fallible internals
    //=====================================================================================

    async fn dynamic_accounts(&self) -> Vec<InternalAccount> {
        match self.read_dynamic_table().await {
            Ok(records) => records
                .iter()
                .enumerate()
                .map(|(index, raw)| coerce_record(index, raw))
                .collect(),
            Err(e) => {
                warn!(error = %e, "Dynamic account table unreadable; using seed accounts only");
                Vec::new()
            }
        }
    }

    async fn try_append(&self, account: &InternalAccount) -> StorageResult<()> {
        // An unreadable table is left untouched rather than replaced.
        let mut table = self.read_dynamic_table().await?;
        table.push(serde_json::to_value(account).map_err(corrupt)?);
        self.write_dynamic_table(&table).await
    }

    async fn try_migrate_credential(
        &self,
        email: &str,
        role: Role,
        new_credential: &str,
    ) -> StorageResult<bool> {
        let mut table = self.read_dynamic_table().await?;
        let position = table.iter().enumerate().position(|(index, raw)| {
            let account = coerce_record(index, raw);
            account.matches(email, role) && account.credential.is_empty()
        });
        let Some(index) = position else {
            return Ok(false);
        };

        match table[index].as_object_mut() {
            Some(record) => {
                record.insert(
                    "password".to_string(),
                    Value::String(new_credential.to_string()),
                );
            }
            None => {
                let mut account = coerce_record(index, &table[index]);
                account.credential = new_credential.to_string();
                table[index] = serde_json::to_value(&account).map_err(corrupt)?;
            }
        }

        self.write_dynamic_table(&table).await?;
        Ok(true)
    }

    async fn try_record_login(&self, event: &LoginEvent) -> StorageResult<()> {
        let mut log = self.read_login_log().await?;
        log.push(serde_json::to_value(event).map_err(|e| log_corrupt(&e))?);
        if log.len() > LOGIN_EVENT_CAP {
            log.drain(..log.len() - LOGIN_EVENT_CAP);
        }
        let raw = serde_json::to_string(&log).map_err(|e| log_corrupt(&e))?;
        self.storage.set(LOGIN_EVENTS_KEY, &raw).await
    }

    async fn read_login_log(&self) -> StorageResult<Vec<Value>> {
        match self.storage.get(LOGIN_EVENTS_KEY).await? {
            Some(raw) if !raw.trim().is_empty() => {
                serde_json::from_str(&raw).map_err(|e| log_corrupt(&e))
            }
            _ => Ok(Vec::new()),
        }
    }

    async fn read_dynamic_table(&self) -> StorageResult<Vec<Value>> {
        let raw = match self.storage.get(DYNAMIC_ACCOUNTS_KEY).await? {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => return Ok(Vec::new()),
        };
        serde_json::from_str(&raw).map_err(corrupt)
    }

    async fn write_dynamic_table(&self, table: &[Value]) -> StorageResult<()> {
        let raw = serde_json::to_string(table).map_err(corrupt)?;
        self.storage.set(DYNAMIC_ACCOUNTS_KEY, &raw).await
    }
}

fn corrupt(e: serde_json::Error) -> StorageError {
    StorageError::Corrupt {
        key: DYNAMIC_ACCOUNTS_KEY.to_string(),
        reason: e.to_string(),
    }
}

fn log_corrupt(e: &serde_json::Error) -> StorageError {
    StorageError::Corrupt {
        key: LOGIN_EVENTS_KEY.to_string(),
        reason: e.to_string(),
    }
}

//=========================================================================================
// Record coercion
//=========================================================================================

/// Turns one raw dynamic-table entry into an account, filling in defaults:
/// a missing id becomes `dyn-<index>`, a missing or unknown role becomes
/// `Role::FALLBACK`, and missing text fields (credential included) become empty.
pub fn coerce_record(index: usize, raw: &Value) -> InternalAccount {
    let text = |field: &str| raw.get(field).and_then(scalar_text);

    InternalAccount {
        id: text("id")
            .map(AccountId::new)
            .unwrap_or_else(|| AccountId::placeholder(index)),
        name: text("name").unwrap_or_default(),
        email: text("email").unwrap_or_default(),
        role: Role::from_tag_or_fallback(text("role").as_deref()),
        credential: text("password").unwrap_or_default(),
    }
}

pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LoginOutcome;
    use crate::memory::MemoryStore;
    use serde_json::json;

    fn store_with_table(table: &str) -> (Arc<MemoryStore>, AccountStore) {
        let storage = Arc::new(MemoryStore::with_entries([(DYNAMIC_ACCOUNTS_KEY, table)]));
        let accounts = AccountStore::new(storage.clone());
        (storage, accounts)
    }

    #[test]
    fn coercion_fills_legacy_gaps() {
        let account = coerce_record(3, &json!({ "email": "b@x.com", "name": "Bea" }));
        assert_eq!(account.id, AccountId::new("dyn-3"));
        assert_eq!(account.role, Role::User);
        assert_eq!(account.credential, "");
        assert_eq!(account.name, "Bea");
    }

    #[test]
    fn coercion_stringifies_numeric_ids_and_tolerates_garbage() {
        let account = coerce_record(0, &json!({ "id": 1712, "role": "nurse", "password": "x" }));
        assert_eq!(account.id.as_str(), "1712");
        assert_eq!(account.role, Role::Nurse);

        let garbage = coerce_record(5, &json!(42));
        assert_eq!(garbage.id.as_str(), "dyn-5");
        assert_eq!(garbage.email, "");
        assert_eq!(garbage.role, Role::FALLBACK);
    }

    #[tokio::test]
    async fn seeds_come_before_dynamic_accounts() {
        let (_, accounts) = store_with_table(
            r#"[{"id":"9","name":"Dup","email":"admin@bodycheck","role":"admin","password":"x"}]"#,
        );
        let all = accounts.list_all().await;
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].email, "admin@bodycheck");
        assert_eq!(all[4].id.as_str(), "9");

        let found = accounts.find("admin@bodycheck", Role::Admin).await.unwrap();
        assert_eq!(found.origin, AccountOrigin::Seed);
        assert_eq!(found.account.credential, SEED_CREDENTIAL);
    }

    #[tokio::test]
    async fn corrupt_table_yields_only_seeds_and_is_not_overwritten() {
        let (storage, accounts) = store_with_table("{not json");
        assert_eq!(accounts.list_all().await.len(), 4);

        let newcomer = InternalAccount {
            id: AccountId::fresh(),
            name: "New".to_string(),
            email: "new@x.com".to_string(),
            role: Role::User,
            credential: "pw".to_string(),
        };
        accounts.append(&newcomer).await;

        let raw = storage.get(DYNAMIC_ACCOUNTS_KEY).await.unwrap();
        assert_eq!(raw.as_deref(), Some("{not json"));
    }

    #[tokio::test]
    async fn append_preserves_existing_records() {
        let (storage, accounts) =
            store_with_table(r#"[{"email":"old@x.com","extra":"kept"}]"#);
        let newcomer = InternalAccount {
            id: AccountId::new("n1"),
            name: "New".to_string(),
            email: "new@x.com".to_string(),
            role: Role::User,
            credential: "pw".to_string(),
        };
        accounts.append(&newcomer).await;

        let raw = storage.get(DYNAMIC_ACCOUNTS_KEY).await.unwrap().unwrap();
        let table: Vec<Value> = serde_json::from_str(&raw).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table[0]["extra"], "kept");
        assert_eq!(table[1]["password"], "pw");
    }

    #[tokio::test]
    async fn migration_targets_first_credential_less_match_only() {
        let (storage, accounts) = store_with_table(
            r#"[
                {"id":"a","email":"b@x.com","role":"user","password":"set"},
                {"id":"b","email":"b@x.com","role":"user"},
                {"id":"c","email":"b@x.com","role":"user","password":""}
            ]"#,
        );
        accounts.migrate_credential("b@x.com", Role::User, "anything").await;

        let raw = storage.get(DYNAMIC_ACCOUNTS_KEY).await.unwrap().unwrap();
        let table: Vec<Value> = serde_json::from_str(&raw).unwrap();
        assert_eq!(table[0]["password"], "set");
        assert_eq!(table[1]["password"], "anything");
        assert_eq!(table[2]["password"], "");
    }

    #[tokio::test]
    async fn login_log_keeps_only_the_newest_events() {
        let storage = Arc::new(MemoryStore::new());
        let accounts = AccountStore::new(storage.clone());

        for n in 0..LOGIN_EVENT_CAP + 5 {
            let event = LoginEvent::now(
                None,
                &format!("u{}@x.com", n),
                Role::User,
                LoginOutcome::AccountNotFound,
            );
            accounts.record_login(&event).await;
        }

        let raw = storage.get(LOGIN_EVENTS_KEY).await.unwrap().unwrap();
        let log: Vec<Value> = serde_json::from_str(&raw).unwrap();
        assert_eq!(log.len(), LOGIN_EVENT_CAP);
        assert_eq!(log[0]["email"], "u5@x.com");

        let recent = accounts.recent_login_events(3).await;
        let emails: Vec<&str> = recent.iter().map(|e| e.email.as_str()).collect();
        let last = LOGIN_EVENT_CAP + 4;
        assert_eq!(
            emails,
            vec![
                format!("u{}@x.com", last),
                format!("u{}@x.com", last - 1),
                format!("u{}@x.com", last - 2),
            ]
        );
    }

    #[tokio::test]
    async fn unreadable_login_log_reads_as_empty() {
        let storage = Arc::new(MemoryStore::with_entries([(LOGIN_EVENTS_KEY, "{nope")]));
        let accounts = AccountStore::new(storage);
        assert!(accounts.recent_login_events(10).await.is_empty());
    }
}
