// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication gate and its Axum middleware.
//!
//! One pass per request, no state kept between requests (apart from the
//! key set cache inside the federated verifier):
//!
//! ```text
//! EXTRACT ─ missing ──────────────────────────────▶ 401
//!    │
//!    ├─ simplified: DECODE ─▶ claim
//!    └─ federated:  VERIFY ─▶ claim   (failure ───▶ 401)
//!                               │
//!                            RESOLVE ─ no user / inactive ─▶ 403
//!                               │
//!                 attach AuthenticatedUser ─▶ next handler
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::extractor::bearer_token;
use super::federated::FederatedVerifier;
use super::resolver::IdentityResolver;
use super::simplified::decode_token;
use super::{AuthError, AuthenticatedUser, CredentialKind};

/// Verification strategy the gate delegates to.
#[derive(Clone)]
pub enum Strategy {
    /// Opaque token decoded to an email
    Simplified,
    /// Keycloak JWT verified against the realm key set
    Federated(FederatedVerifier),
}

impl Strategy {
    pub fn kind(&self) -> CredentialKind {
        match self {
            Strategy::Simplified => CredentialKind::Simplified,
            Strategy::Federated(_) => CredentialKind::Federated,
        }
    }
}

/// Request-time authenticator.
#[derive(Clone)]
pub struct AuthGate {
    strategy: Strategy,
    resolver: IdentityResolver,
}

impl AuthGate {
    pub fn new(strategy: Strategy, resolver: IdentityResolver) -> Self {
        Self { strategy, resolver }
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }

    /// Authenticate the credential carried by `headers`.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthenticatedUser, AuthError> {
        let token = bearer_token(headers).ok_or(AuthError::MissingCredential)?;

        let claim = match &self.strategy {
            Strategy::Simplified => {
                let decoded = decode_token(token);
                if decoded.is_fallback() {
                    tracing::trace!("Simplified token is not base64, using it verbatim");
                }
                decoded.into_claim()
            }
            Strategy::Federated(verifier) => verifier.verify(token).await?,
        };

        let identity = self.resolver.resolve(&claim)?;

        Ok(AuthenticatedUser {
            identity,
            claim,
            kind: self.strategy.kind(),
        })
    }
}

/// Authentication middleware function.
///
/// On success the resolved [`AuthenticatedUser`] is added to the request
/// extensions and the request is forwarded; otherwise the rejection is the
/// response and the inner service never runs.
///
/// ```rust,ignore
/// let protected = Router::new()
///     .route("/me", get(me))
///     .route_layer(axum::middleware::from_fn_with_state(gate, auth_middleware));
/// ```
pub async fn auth_middleware(
    State(gate): State<Arc<AuthGate>>,
    mut request: Request,
    next: Next,
) -> Response {
    match gate.authenticate(request.headers()).await {
        Ok(user) => {
            tracing::debug!(user_id = %user.identity.id, kind = ?user.kind, "Request authenticated");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => {
            match &e {
                AuthError::KeySetUnavailable(reason) => {
                    tracing::warn!(error_code = e.error_code(), %reason, "Rejecting request");
                }
                _ => {
                    tracing::debug!(error_code = e.error_code(), kind = e.kind(), error = %e, "Rejecting request");
                }
            }
            e.into_response()
        }
    }
}
