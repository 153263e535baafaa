// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{AuthGate, FederatedVerifier, IdentityResolver, JwksManager, Strategy};
use crate::store::{InMemoryUserStore, UserDirectory};

#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<AuthGate>,
    pub directory: Arc<dyn UserDirectory>,
}

impl AppState {
    pub fn new(strategy: Strategy, directory: Arc<dyn UserDirectory>) -> Self {
        let resolver = IdentityResolver::new(directory.clone());
        Self {
            gate: Arc::new(AuthGate::new(strategy, resolver)),
            directory,
        }
    }

    pub fn simplified(directory: Arc<dyn UserDirectory>) -> Self {
        Self::new(Strategy::Simplified, directory)
    }

    pub fn federated(verifier: FederatedVerifier, directory: Arc<dyn UserDirectory>) -> Self {
        Self::new(Strategy::Federated(verifier), directory)
    }

    /// Key set manager, present in federated mode only.
    pub fn jwks(&self) -> Option<&JwksManager> {
        match self.gate.strategy() {
            Strategy::Federated(verifier) => Some(verifier.jwks()),
            Strategy::Simplified => None,
        }
    }

    pub fn is_federated(&self) -> bool {
        self.jwks().is_some()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::simplified(Arc::new(InMemoryUserStore::new()))
    }
}
