// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory user directory.
//!
//! The directory is the system of record for [`UserIdentity`]; this crate
//! only reads it. Records are keyed by their exact email address, which is
//! the single join key between a verified claim and a user.

use std::collections::HashMap;
use std::path::Path;

use crate::models::UserIdentity;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read user file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid user file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate email in user file: {0}")]
    DuplicateEmail(String),
}

/// Read-only lookup of user records.
pub trait UserDirectory: Send + Sync {
    /// Exact, case-sensitive email match.
    fn find_by_email(&self, email: &str) -> Option<UserIdentity>;
}

#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: HashMap<String, UserIdentity>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record for `user.email`.
    pub fn insert(&mut self, user: UserIdentity) -> Option<UserIdentity> {
        self.users.insert(user.email.clone(), user)
    }

    /// Build a directory from a list of records, rejecting duplicate emails.
    pub fn from_users(users: Vec<UserIdentity>) -> Result<Self, StoreError> {
        let mut store = Self::new();
        for user in users {
            let email = user.email.clone();
            if store.insert(user).is_some() {
                return Err(StoreError::DuplicateEmail(email));
            }
        }
        Ok(store)
    }

    /// Load a JSON array of user records.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path)?;
        let users: Vec<UserIdentity> = serde_json::from_str(&raw)?;
        Self::from_users(users)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl UserDirectory for InMemoryUserStore {
    fn find_by_email(&self, email: &str) -> Option<UserIdentity> {
        self.users.get(email).cloned()
    }
}
