// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Keycloak JWT verification.
//!
//! 1. Fetch the realm key set (`<base>/realms/<realm>/protocol/openid-connect/certs`)
//! 2. Verify signature, expiry and algorithm against the key named by `kid`
//! 3. Return the identity claim (`email`, else `preferred_username`)
//!
//! A token whose key is missing from the cached set, or whose signature does
//! not verify, triggers one forced key set refetch and a single retry before
//! it is rejected. The refetch is skipped while the cached set is younger
//! than the manager's minimum refetch interval.

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{decode, decode_header, Validation};

use super::claims::FederatedClaims;
use super::error::{AuthError, InvalidTokenReason};
use super::jwks::{candidate_keys, jwk_to_decoding_key, JwksManager, KeySnapshot};
use crate::config::{ConfigError, FederatedConfig};

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Verifies Keycloak-issued bearer tokens.
#[derive(Clone)]
pub struct FederatedVerifier {
    jwks: Arc<JwksManager>,
}

impl FederatedVerifier {
    pub fn new(jwks: Arc<JwksManager>) -> Self {
        Self { jwks }
    }

    /// Build a verifier for the configured realm. Fails only on startup
    /// problems: an unusable base URL or HTTP client.
    pub fn for_realm(config: &FederatedConfig, cache_ttl: Duration) -> Result<Self, ConfigError> {
        let url = config.jwks_url()?;
        let jwks = JwksManager::new(url)?.with_cache_ttl(cache_ttl);
        Ok(Self::new(Arc::new(jwks)))
    }

    pub fn jwks(&self) -> &JwksManager {
        &self.jwks
    }

    /// Verify `token` and return its identity claim.
    pub async fn verify(&self, token: &str) -> Result<String, AuthError> {
        let snapshot = self.jwks.keys().await?;

        let claims = match verify_with(token, &snapshot) {
            Err(e) if e.may_be_key_rotation() => {
                let refreshed = self.jwks.refresh_after(snapshot.generation).await?;
                verify_with(token, &refreshed)?
            }
            other => other?,
        };

        claims
            .identity_claim()
            .map(str::to_string)
            .ok_or(AuthError::ClaimMissing)
    }
}

/// Verify against one key set snapshot, without fetching.
fn verify_with(token: &str, snapshot: &KeySnapshot) -> Result<FederatedClaims, AuthError> {
    let header = decode_header(token).map_err(|_| InvalidTokenReason::Malformed)?;

    let candidates = candidate_keys(&snapshot.jwks, header.kid.as_deref());
    if candidates.is_empty() {
        return Err(InvalidTokenReason::NoMatchingKey.into());
    }

    let mut last_error = AuthError::InvalidToken(InvalidTokenReason::NoMatchingKey);
    for jwk in candidates {
        let (decoding_key, algorithm) = match jwk_to_decoding_key(jwk) {
            Ok(pair) => pair,
            Err(e) => {
                last_error = e;
                continue;
            }
        };
        if algorithm != header.alg {
            last_error = InvalidTokenReason::AlgorithmMismatch.into();
            continue;
        }

        let mut validation = Validation::new(algorithm);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        // Keycloak access tokens carry `aud: account` or none at all.
        validation.validate_aud = false;

        match decode::<FederatedClaims>(token, &decoding_key, &validation) {
            Ok(data) => return Ok(data.claims),
            Err(e) => {
                let reason = InvalidTokenReason::from(e);
                // Only a key mismatch makes the next key worth trying;
                // anything else was decided by a key that did verify.
                if !matches!(
                    reason,
                    InvalidTokenReason::BadSignature | InvalidTokenReason::AlgorithmMismatch
                ) {
                    return Err(reason.into());
                }
                last_error = reason.into();
            }
        }
    }

    Err(last_error)
}
