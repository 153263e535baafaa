// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token claims and the authenticated request context.

use serde::Deserialize;

use crate::models::UserIdentity;

/// Claims read from a Keycloak access token.
///
/// Only the identity claims are consumed; `exp`/`nbf` are checked by the
/// decoder's validation.
#[derive(Debug, Clone, Deserialize)]
pub struct FederatedClaims {
    /// Subject (Keycloak user id)
    #[serde(default)]
    pub sub: Option<String>,

    /// Expiration timestamp
    pub exp: i64,

    /// Issuer (realm URL)
    #[serde(default)]
    pub iss: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub preferred_username: Option<String>,
}

impl FederatedClaims {
    /// `email`, falling back to `preferred_username`. Blank values count as absent.
    pub fn identity_claim(&self) -> Option<&str> {
        self.email
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| {
                self.preferred_username
                    .as_deref()
                    .filter(|v| !v.trim().is_empty())
            })
    }
}

/// Which strategy authenticated the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    Simplified,
    Federated,
}

/// Identity attached to a request once the gate has let it through.
///
/// Handlers read it from request extensions (see [`Auth`](super::Auth)).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Resolved, active directory record
    pub identity: UserIdentity,
    /// Claim value the record was resolved from
    pub claim: String,
    pub kind: CredentialKind,
}

impl AuthenticatedUser {
    pub fn email(&self) -> &str {
        &self.identity.email
    }

    pub fn role(&self) -> Option<&str> {
        self.identity.role.as_deref()
    }
}
