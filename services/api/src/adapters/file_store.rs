//! services/api/src/adapters/file_store.rs
//!
//! This module contains the file adapter, the concrete implementation of the
//! `KeyValueStore` port used by the demo shell. One JSON file plays the part of
//! one browser profile's local storage: a flat object of string keys to string
//! values.

use async_trait::async_trait;
use bodycheck_core::ports::{KeyValueStore, StorageError, StorageResult};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::debug;

type Entries = BTreeMap<String, String>;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A file-backed adapter that implements the `KeyValueStore` port.
pub struct FileStore {
    path: PathBuf,
    // Serialises each read-modify-write cycle on the file.
    io_lock: Mutex<()>,
}

impl FileStore {
    /// Opens the store at `path`, creating its parent directory if needed.
    ///
    /// The file itself is created on first write.
    pub async fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        if tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_dir()) {
            return Err(StorageError::Unavailable(format!(
                "{} is a directory",
                path.display()
            )));
        }
        debug!(path = %path.display(), "Opened file store");
        Ok(Self {
            path,
            io_lock: Mutex::new(()),
        })
    }

    async fn load(&self) -> StorageResult<Entries> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Entries::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Entries::new());
        }
        serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt {
            key: self.path.display().to_string(),
            reason: e.to_string(),
        })
    }

    async fn save(&self, entries: &Entries) -> StorageResult<()> {
        let raw = serde_json::to_string_pretty(entries).map_err(|e| StorageError::Corrupt {
            key: self.path.display().to_string(),
            reason: e.to_string(),
        })?;
        // Write beside the target and rename so a crash never leaves half a file.
        let staging = self.path.with_extension("tmp");
        tokio::fs::write(&staging, raw).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }
}

//=========================================================================================
// `KeyValueStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let _io = self.io_lock.lock().await;
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let _io = self.io_lock.lock().await;
        let mut entries = self.load().await?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries).await
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        let _io = self.io_lock.lock().await;
        let mut entries = self.load().await?;
        if entries.remove(key).is_some() {
            self.save(&entries).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bodycheck_core::{Role, SessionManager};
    use std::sync::Arc;

    #[tokio::test]
    async fn values_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile").join("storage.json");

        let store = FileStore::open(&path).await.unwrap();
        assert_eq!(store.get("auth_user").await.unwrap(), None);
        store.set("auth_user", "{}").await.unwrap();
        store.set("email", "a@x.com").await.unwrap();
        store.remove("email").await.unwrap();
        store.remove("never-set").await.unwrap();

        let reopened = FileStore::open(&path).await.unwrap();
        assert_eq!(reopened.get("auth_user").await.unwrap().as_deref(), Some("{}"));
        assert_eq!(reopened.get("email").await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_file_reports_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "[1, 2").unwrap();

        let store = FileStore::open(&path).await.unwrap();
        assert!(matches!(
            store.get("auth_user").await,
            Err(StorageError::Corrupt { .. })
        ));
    }

    #[tokio::test]
    async fn directory_path_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FileStore::open(dir.path()).await.is_err());
    }

    #[tokio::test]
    async fn session_survives_process_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");

        let sessions = SessionManager::restore(Arc::new(FileStore::open(&path).await.unwrap())).await;
        sessions.signup("", "bob@y.com", "p@ss1", Role::User).await.unwrap();
        drop(sessions);

        let restarted =
            SessionManager::restore(Arc::new(FileStore::open(&path).await.unwrap())).await;
        let account = restarted.current_session().account.unwrap();
        assert_eq!(account.name, "bob");
        restarted.logout().await;
        assert!(restarted.login("bob@y.com", "p@ss1", Role::User).await.is_ok());
    }
}
