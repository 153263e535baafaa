// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Client Session
//!
//! The consumer side of the gateway: keeps one client's credential, checks
//! it against `/me`, refreshes federated tokens and decides what guarded
//! routes may show.
//!
//! - [`SessionController`] owns the credential lifecycle
//! - [`CredentialVault`] persists the `(email, token)` pair
//! - [`HttpIdentityApi`] talks to the gateway
//! - [`KeycloakClient`] holds and refreshes federated tokens
//! - [`RouteGuard`] / [`GuardTable`] turn session state into a routing decision

pub mod api;
pub mod error;
pub mod federated;
pub mod guard;
pub mod session;
pub mod storage;

pub use api::{HttpIdentityApi, IdentityApi};
pub use error::ClientError;
pub use federated::{FederatedClient, KeycloakClient};
pub use guard::{GuardDecision, GuardTable, RoleSet, RouteGuard};
pub use session::{SessionController, SessionState, ValidationLatch};
pub use storage::{CredentialVault, FileStorage, LocalStorage, MemoryStorage, StoredCredential};
