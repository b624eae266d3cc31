pub mod account_store;
pub mod domain;
pub mod guard;
pub mod keys;
pub mod memory;
pub mod ports;
pub mod session_manager;

pub use account_store::{seed_accounts, AccountMatch, AccountOrigin, AccountStore, LOGIN_EVENT_CAP};
pub use domain::{
    AccountId, InternalAccount, LoginEvent, LoginOutcome, PublicAccount, Role, SessionSnapshot,
};
pub use guard::AccessError;
pub use memory::MemoryStore;
pub use ports::{AuthError, AuthResult, KeyValueStore, StorageError, StorageResult};
pub use session_manager::SessionManager;
