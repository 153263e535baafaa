// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persisted client credentials.
//!
//! A [`LocalStorage`] is a flat string key/value store, the way a browser's
//! local storage is. The [`CredentialVault`] owns the two credential keys and
//! always writes or clears them together.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::ClientError;

/// Storage key holding the user's email.
pub const EMAIL_KEY: &str = "user_email";
/// Storage key holding the bearer token.
pub const TOKEN_KEY: &str = "auth_token";

/// Flat key/value storage.
pub trait LocalStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError>;

    /// Apply every change in one write. `None` removes the key.
    fn apply(&self, changes: &[(&str, Option<&str>)]) -> Result<(), ClientError>;
}

fn apply_changes(map: &mut HashMap<String, String>, changes: &[(&str, Option<&str>)]) {
    for (key, value) in changes {
        match value {
            Some(value) => {
                map.insert(key.to_string(), value.to_string());
            }
            None => {
                map.remove(*key);
            }
        }
    }
}

fn poisoned<T>(_: T) -> ClientError {
    ClientError::Storage("storage lock poisoned".to_string())
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        let entries = self.entries.lock().map_err(poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn apply(&self, changes: &[(&str, Option<&str>)]) -> Result<(), ClientError> {
        let mut entries = self.entries.lock().map_err(poisoned)?;
        apply_changes(&mut entries, changes);
        Ok(())
    }
}

/// JSON object on disk, rewritten through a temp file on every change.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, String>, ClientError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => {
                return Err(ClientError::Storage(format!(
                    "read {}: {e}",
                    self.path.display()
                )))
            }
        };
        serde_json::from_str(&raw)
            .map_err(|e| ClientError::Storage(format!("parse {}: {e}", self.path.display())))
    }

    fn write_all(&self, entries: &HashMap<String, String>) -> Result<(), ClientError> {
        let json = serde_json::to_vec_pretty(entries)
            .map_err(|e| ClientError::Storage(format!("serialize: {e}")))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)
            .and_then(|()| fs::rename(&tmp, &self.path))
            .map_err(|e| ClientError::Storage(format!("write {}: {e}", self.path.display())))
    }
}

impl LocalStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        Ok(self.read_all()?.remove(key))
    }

    fn apply(&self, changes: &[(&str, Option<&str>)]) -> Result<(), ClientError> {
        let _guard = self.write_lock.lock().map_err(poisoned)?;
        let mut entries = self.read_all()?;
        apply_changes(&mut entries, changes);
        self.write_all(&entries)
    }
}

/// Persisted `(email, token)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredential {
    pub email: String,
    pub token: String,
}

#[derive(Clone)]
pub struct CredentialVault {
    storage: Arc<dyn LocalStorage>,
}

impl CredentialVault {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self { storage }
    }

    /// The stored pair, or `None` unless both halves are present.
    ///
    /// A half-written pair is cleared on sight.
    pub fn load(&self) -> Result<Option<StoredCredential>, ClientError> {
        let email = self.storage.get(EMAIL_KEY)?;
        let token = self.storage.get(TOKEN_KEY)?;
        match (email, token) {
            (Some(email), Some(token)) => Ok(Some(StoredCredential { email, token })),
            (None, None) => Ok(None),
            _ => {
                tracing::warn!("Discarding incomplete stored credential");
                self.clear()?;
                Ok(None)
            }
        }
    }

    pub fn save(&self, credential: &StoredCredential) -> Result<(), ClientError> {
        self.storage.apply(&[
            (EMAIL_KEY, Some(credential.email.as_str())),
            (TOKEN_KEY, Some(credential.token.as_str())),
        ])
    }

    pub fn clear(&self) -> Result<(), ClientError> {
        self.storage.apply(&[(EMAIL_KEY, None), (TOKEN_KEY, None)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential() -> StoredCredential {
        StoredCredential {
            email: "ana@example.com".to_string(),
            token: "token-1".to_string(),
        }
    }

    #[test]
    fn vault_saves_and_clears_both_keys() {
        let storage = Arc::new(MemoryStorage::new());
        let vault = CredentialVault::new(storage.clone());

        vault.save(&credential()).unwrap();
        assert_eq!(storage.get(EMAIL_KEY).unwrap().as_deref(), Some("ana@example.com"));
        assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("token-1"));
        assert_eq!(vault.load().unwrap(), Some(credential()));

        vault.clear().unwrap();
        assert_eq!(storage.get(EMAIL_KEY).unwrap(), None);
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(vault.load().unwrap(), None);
    }

    #[test]
    fn vault_discards_half_pair() {
        let storage = Arc::new(MemoryStorage::new());
        storage.apply(&[(TOKEN_KEY, Some("orphan"))]).unwrap();

        let vault = CredentialVault::new(storage.clone());
        assert_eq!(vault.load().unwrap(), None);
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn vault_leaves_unrelated_keys() {
        let storage = Arc::new(MemoryStorage::new());
        storage.apply(&[("theme", Some("dark"))]).unwrap();

        let vault = CredentialVault::new(storage.clone());
        vault.save(&credential()).unwrap();
        vault.clear().unwrap();
        assert_eq!(storage.get("theme").unwrap().as_deref(), Some("dark"));
    }

    #[test]
    fn file_storage_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        CredentialVault::new(Arc::new(FileStorage::new(&path)))
            .save(&credential())
            .unwrap();

        let reopened = CredentialVault::new(Arc::new(FileStorage::new(&path)));
        assert_eq!(reopened.load().unwrap(), Some(credential()));

        reopened.clear().unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw.trim(), "{}");
    }

    #[test]
    fn file_storage_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("absent.json"));
        assert_eq!(storage.get(EMAIL_KEY).unwrap(), None);
    }

    #[test]
    fn file_storage_reports_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();

        let storage = FileStorage::new(&path);
        assert!(matches!(storage.get(EMAIL_KEY), Err(ClientError::Storage(_))));
    }
}
