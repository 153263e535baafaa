// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client session controller.
//!
//! Owns the credential lifecycle of one client:
//!
//! 1. `load()` picks up an existing credential (stored pair in simplified
//!    mode, SDK session in federated mode) and validates it once
//! 2. `login()` (simplified) replaces the credential and validates the new one
//! 3. `logout()` clears everything, including the provider session
//!
//! Each credential is validated at most once. The [`ValidationLatch`] moves
//! `Idle → Validating → Done` and only goes back to `Idle` on logout or
//! credential replacement. Replacement and every clearing path bump an epoch
//! so a validation or refresh that finishes afterwards is ignored.
//!
//! Every failure ends in a cleared, signed-out session.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::api::IdentityApi;
use super::federated::{FederatedClient, KeycloakClient};
use super::storage::{CredentialVault, LocalStorage, StoredCredential};
use super::ClientError;
use crate::models::MeResponse;

/// How often the federated access token is checked.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Refresh when the access token has less than this left.
pub const MIN_TOKEN_VALIDITY: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub loading: bool,
    /// A credential was found and presented.
    pub authenticated: bool,
    /// The identity endpoint accepted the credential.
    pub authorized: bool,
    pub identity: Option<MeResponse>,
    pub token: Option<String>,
}

impl SessionState {
    fn loading() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    fn presented(token: String) -> Self {
        Self {
            loading: true,
            authenticated: true,
            token: Some(token),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationLatch {
    #[default]
    Idle,
    Validating,
    Done,
}

enum Mode<F> {
    Simplified,
    Federated(Arc<F>),
}

struct Inner {
    latch: ValidationLatch,
    epoch: u64,
    refresh_cancel: Option<CancellationToken>,
}

struct Shared {
    vault: CredentialVault,
    inner: Mutex<Inner>,
    state: watch::Sender<SessionState>,
}

impl Shared {
    fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    fn publish(&self, state: SessionState) {
        self.state.send_replace(state);
    }

    /// Stop the refresh timer, forget the stored pair and sign out.
    ///
    /// Retires the current credential: results still in flight for it are
    /// dropped, and an interrupted validation counts as done.
    fn clear_locked(&self, inner: &mut Inner) {
        inner.epoch += 1;
        if inner.latch == ValidationLatch::Validating {
            inner.latch = ValidationLatch::Done;
        }
        if let Some(cancel) = inner.refresh_cancel.take() {
            cancel.cancel();
        }
        if let Err(e) = self.vault.clear() {
            warn!(error = %e, "Failed to clear stored credential");
        }
        self.publish(SessionState::default());
    }
}

pub struct SessionController<A, F = KeycloakClient> {
    api: Arc<A>,
    mode: Mode<F>,
    shared: Arc<Shared>,
    shutdown: CancellationToken,
    refresh_interval: Duration,
}

impl<A: IdentityApi> SessionController<A> {
    pub fn simplified(api: Arc<A>, storage: Arc<dyn LocalStorage>) -> Self {
        Self::with_mode(api, storage, Mode::Simplified)
    }
}

impl<A: IdentityApi, F: FederatedClient> SessionController<A, F> {
    pub fn federated(api: Arc<A>, storage: Arc<dyn LocalStorage>, client: Arc<F>) -> Self {
        Self::with_mode(api, storage, Mode::Federated(client))
    }

    fn with_mode(api: Arc<A>, storage: Arc<dyn LocalStorage>, mode: Mode<F>) -> Self {
        let (state, _) = watch::channel(SessionState::loading());
        Self {
            api,
            mode,
            shared: Arc::new(Shared {
                vault: CredentialVault::new(storage),
                inner: Mutex::new(Inner {
                    latch: ValidationLatch::Idle,
                    epoch: 0,
                    refresh_cancel: None,
                }),
                state,
            }),
            shutdown: CancellationToken::new(),
            refresh_interval: REFRESH_INTERVAL,
        }
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn state(&self) -> SessionState {
        self.shared.current()
    }

    /// Watch state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    pub async fn latch(&self) -> ValidationLatch {
        self.shared.inner.lock().await.latch
    }

    /// Pick up an existing credential and validate it.
    ///
    /// Safe to call repeatedly: once a credential is known, later calls only
    /// reach the latched validation.
    pub async fn load(&self) -> SessionState {
        match &self.mode {
            Mode::Simplified => self.load_stored().await,
            Mode::Federated(client) => self.load_federated(client.clone()).await,
        }
        self.validate().await
    }

    async fn load_stored(&self) {
        let mut inner = self.shared.inner.lock().await;
        if inner.latch != ValidationLatch::Idle || self.shared.current().token.is_some() {
            return;
        }
        match self.shared.vault.load() {
            Ok(Some(credential)) => {
                debug!("Found stored credential");
                self.shared.publish(SessionState::presented(credential.token));
            }
            Ok(None) => self.shared.publish(SessionState::default()),
            Err(e) => {
                warn!(error = %e, "Stored credential unreadable, signing out");
                self.shared.clear_locked(&mut inner);
            }
        }
    }

    async fn load_federated(&self, client: Arc<F>) {
        let mut inner = self.shared.inner.lock().await;
        if inner.latch != ValidationLatch::Idle || self.shared.current().token.is_some() {
            return;
        }
        match client.init().await {
            Ok(true) => match client.token().await {
                Some(token) => {
                    self.shared.publish(SessionState::presented(token));
                    self.start_refresh(&mut inner, client);
                }
                None => self.shared.publish(SessionState::default()),
            },
            Ok(false) => self.shared.publish(SessionState::default()),
            Err(e) => {
                warn!(error = %e, "Identity provider init failed, signing out");
                self.shared.clear_locked(&mut inner);
            }
        }
    }

    /// Validate the current credential against the identity endpoint.
    ///
    /// Runs at most once per credential; concurrent and repeated calls
    /// return the current state without another request.
    pub async fn validate(&self) -> SessionState {
        let (epoch, token) = {
            let mut inner = self.shared.inner.lock().await;
            if inner.latch != ValidationLatch::Idle {
                debug!(latch = ?inner.latch, "Credential already validated");
                return self.shared.current();
            }
            let Some(token) = self.shared.current().token else {
                return self.shared.current();
            };
            inner.latch = ValidationLatch::Validating;
            (inner.epoch, token)
        };

        let result = self.api.whoami(&token).await;

        let mut inner = self.shared.inner.lock().await;
        if inner.epoch != epoch {
            debug!("Ignoring validation result for a retired credential");
            return self.shared.current();
        }
        inner.latch = ValidationLatch::Done;

        match result {
            Ok(identity) => {
                // Same epoch: a refresh may have rotated the token meanwhile.
                let token = self.shared.current().token.unwrap_or(token);
                self.shared.publish(SessionState {
                    loading: false,
                    authenticated: true,
                    authorized: true,
                    identity: Some(identity),
                    token: Some(token),
                });
            }
            Err(e) if e.is_rejection() => {
                info!(error = %e, "Credential rejected, signing out");
                self.shared.clear_locked(&mut inner);
            }
            Err(e) => {
                warn!(error = %e, "Could not validate credential, signing out");
                self.shared.clear_locked(&mut inner);
            }
        }
        self.shared.current()
    }

    /// Log in with an email (simplified mode) and validate the new token.
    pub async fn login(&self, email: &str) -> Result<SessionState, ClientError> {
        if let Mode::Federated(_) = self.mode {
            return Err(ClientError::Unsupported(
                "login goes through the identity provider".to_string(),
            ));
        }

        let token = match self.api.login(email).await {
            Ok(token) => token,
            Err(e) => {
                let mut inner = self.shared.inner.lock().await;
                inner.latch = ValidationLatch::Idle;
                self.shared.clear_locked(&mut inner);
                return Err(e);
            }
        };

        {
            let mut inner = self.shared.inner.lock().await;
            inner.epoch += 1;
            inner.latch = ValidationLatch::Idle;
            let credential = StoredCredential {
                email: email.to_string(),
                token,
            };
            if let Err(e) = self.shared.vault.save(&credential) {
                self.shared.clear_locked(&mut inner);
                return Err(e);
            }
            self.shared.publish(SessionState::presented(credential.token));
        }

        Ok(self.validate().await)
    }

    /// Sign out locally and, in federated mode, at the provider.
    ///
    /// Local state is cleared even when the provider call fails.
    pub async fn logout(&self) -> Result<(), ClientError> {
        {
            let mut inner = self.shared.inner.lock().await;
            inner.latch = ValidationLatch::Idle;
            self.shared.clear_locked(&mut inner);
        }
        if let Mode::Federated(client) = &self.mode {
            client.logout().await?;
        }
        info!("Signed out");
        Ok(())
    }

    fn start_refresh(&self, inner: &mut Inner, client: Arc<F>) {
        let cancel = self.shutdown.child_token();
        if let Some(previous) = inner.refresh_cancel.replace(cancel.clone()) {
            previous.cancel();
        }

        let shared = self.shared.clone();
        let epoch = inner.epoch;
        let interval = self.refresh_interval;

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {},
                    _ = cancel.cancelled() => {
                        debug!("Token refresh timer stopped");
                        return;
                    }
                }

                let result = client.update_token(MIN_TOKEN_VALIDITY).await;

                let mut inner = shared.inner.lock().await;
                if inner.epoch != epoch || cancel.is_cancelled() {
                    return;
                }
                match result {
                    Ok(false) => {}
                    Ok(true) => {
                        let token = client.token().await;
                        shared.state.send_modify(|state| state.token = token);
                    }
                    Err(e) => {
                        warn!(error = %e, "Token refresh failed, signing out");
                        shared.clear_locked(&mut inner);
                        return;
                    }
                }
            }
        });
    }
}

impl<A, F> Drop for SessionController<A, F> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
