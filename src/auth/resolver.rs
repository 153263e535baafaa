// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity resolution: claim → active directory record.

use std::sync::Arc;

use super::error::AuthError;
use crate::models::UserIdentity;
use crate::store::UserDirectory;

/// Maps an identity claim to a user and enforces the active-status policy.
#[derive(Clone)]
pub struct IdentityResolver {
    directory: Arc<dyn UserDirectory>,
}

impl IdentityResolver {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }

    /// Resolve `claim` by exact email match.
    ///
    /// - no record → [`AuthError::Unauthenticated`]
    /// - inactive record → [`AuthError::Forbidden`]
    pub fn resolve(&self, claim: &str) -> Result<UserIdentity, AuthError> {
        let user = self
            .directory
            .find_by_email(claim)
            .ok_or(AuthError::Unauthenticated)?;

        if !user.is_active() {
            return Err(AuthError::Forbidden);
        }

        Ok(user)
    }
}
