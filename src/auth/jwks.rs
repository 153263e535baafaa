// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Caching
//!
//! - Keys are cached with a configurable TTL (default 5 minutes)
//! - Readers share a `RwLock`; only one task fetches at a time
//! - Every successful fetch bumps a generation counter, so callers that saw a
//!   key rotation can ask for "newer than generation N" and concurrent
//!   rotation refetches collapse into a single request
//! - Forced refetches are rate limited: while the cached set is younger than
//!   the minimum refetch interval, a rotation refetch reuses it

use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{
    AlgorithmParameters, EllipticCurve, Jwk, JwkSet, KeyAlgorithm, KeyOperations, PublicKeyUse,
};
use jsonwebtoken::{Algorithm, DecodingKey};
use tokio::sync::{Mutex, RwLock};
use url::Url;

use super::error::{AuthError, InvalidTokenReason};

/// Default JWKS cache TTL (5 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Minimum age of the cached set before a verification failure may force
/// another fetch.
pub const DEFAULT_MIN_REFETCH_INTERVAL: Duration = Duration::from_secs(30);

/// Fetch timeout for the JWKS endpoint.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// JWKS cache entry.
struct CacheEntry {
    jwks: Arc<JwkSet>,
    fetched_at: Instant,
    generation: u64,
}

/// A key set as seen by one verification attempt.
#[derive(Clone)]
pub struct KeySnapshot {
    pub jwks: Arc<JwkSet>,
    /// Generation the snapshot was taken from; pass to
    /// [`JwksManager::refresh_after`] to force a newer one.
    pub generation: u64,
}

/// JWKS manager with caching.
#[derive(Clone)]
pub struct JwksManager {
    /// JWKS URL (realm certs endpoint)
    jwks_url: Url,
    /// Cache TTL
    cache_ttl: Duration,
    /// Forced refetch rate limit
    min_refetch_interval: Duration,
    /// Cached JWKS
    cache: Arc<RwLock<Option<CacheEntry>>>,
    /// Held by whichever task is fetching
    refresh_lock: Arc<Mutex<()>>,
    /// HTTP client
    client: reqwest::Client,
}

impl JwksManager {
    /// Create a new JWKS manager for the given endpoint.
    pub fn new(jwks_url: Url) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;

        Ok(Self {
            jwks_url,
            cache_ttl: DEFAULT_CACHE_TTL,
            min_refetch_interval: DEFAULT_MIN_REFETCH_INTERVAL,
            cache: Arc::new(RwLock::new(None)),
            refresh_lock: Arc::new(Mutex::new(())),
            client,
        })
    }

    /// Create with custom cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Create with a custom forced refetch rate limit.
    pub fn with_min_refetch_interval(mut self, interval: Duration) -> Self {
        self.min_refetch_interval = interval;
        self
    }

    /// Get the JWKS URL.
    pub fn jwks_url(&self) -> &Url {
        &self.jwks_url
    }

    /// Cached key set, fetching when absent or older than the TTL.
    pub async fn keys(&self) -> Result<KeySnapshot, AuthError> {
        if let Some(snapshot) = self.fresh_snapshot().await {
            return Ok(snapshot);
        }

        let _guard = self.refresh_lock.lock().await;
        // Another task may have refreshed while we waited for the lock.
        if let Some(snapshot) = self.fresh_snapshot().await {
            return Ok(snapshot);
        }
        self.fetch_and_store().await
    }

    /// Key set strictly newer than `seen_generation`.
    ///
    /// Used after a signature failure that may be a key rotation. If another
    /// task already refreshed past `seen_generation`, its result is reused.
    /// A set fetched less than the minimum refetch interval ago is returned
    /// as is, so unverifiable tokens cannot drive fetches.
    pub async fn refresh_after(&self, seen_generation: u64) -> Result<KeySnapshot, AuthError> {
        let _guard = self.refresh_lock.lock().await;
        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.as_ref() {
                let snapshot = KeySnapshot {
                    jwks: entry.jwks.clone(),
                    generation: entry.generation,
                };
                if entry.generation > seen_generation {
                    return Ok(snapshot);
                }
                if entry.fetched_at.elapsed() < self.min_refetch_interval {
                    tracing::debug!(
                        jwks_url = %self.jwks_url,
                        generation = entry.generation,
                        "JWKS refetch rate limited, reusing cached set"
                    );
                    return Ok(snapshot);
                }
            }
        }
        tracing::warn!(
            jwks_url = %self.jwks_url,
            generation = seen_generation,
            "Refetching JWKS after verification failure"
        );
        self.fetch_and_store().await
    }

    /// Force refresh the JWKS cache.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        let _guard = self.refresh_lock.lock().await;
        self.fetch_and_store().await.map(|_| ())
    }

    /// Check if JWKS is currently cached and valid.
    pub async fn is_cached(&self) -> bool {
        self.fresh_snapshot().await.is_some()
    }

    async fn fresh_snapshot(&self) -> Option<KeySnapshot> {
        let cache = self.cache.read().await;
        cache
            .as_ref()
            .filter(|entry| entry.fetched_at.elapsed() < self.cache_ttl)
            .map(|entry| KeySnapshot {
                jwks: entry.jwks.clone(),
                generation: entry.generation,
            })
    }

    /// Fetch and replace the cache entry. Callers hold `refresh_lock`.
    async fn fetch_and_store(&self) -> Result<KeySnapshot, AuthError> {
        let jwks = Arc::new(self.fetch_jwks().await?);

        let mut cache = self.cache.write().await;
        let generation = cache.as_ref().map_or(1, |e| e.generation + 1);
        *cache = Some(CacheEntry {
            jwks: jwks.clone(),
            fetched_at: Instant::now(),
            generation,
        });

        tracing::debug!(
            jwks_url = %self.jwks_url,
            keys = jwks.keys.len(),
            generation,
            "JWKS cache updated"
        );
        Ok(KeySnapshot { jwks, generation })
    }

    /// Fetch JWKS from the endpoint.
    async fn fetch_jwks(&self) -> Result<JwkSet, AuthError> {
        let response = self
            .client
            .get(self.jwks_url.clone())
            .send()
            .await
            .map_err(|e| AuthError::KeySetUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::KeySetUnavailable(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::KeySetUnavailable(format!("invalid JWKS document: {e}")))
    }
}

/// Keys worth trying for a token: the `kid` match, or every key when the
/// token names none. Keys published for encryption are never candidates.
pub fn candidate_keys<'a>(jwks: &'a JwkSet, kid: Option<&str>) -> Vec<&'a Jwk> {
    jwks.keys
        .iter()
        .filter(|k| is_verification_key(k))
        .filter(|k| kid.is_none() || k.common.key_id.as_deref() == kid)
        .collect()
}

fn is_verification_key(jwk: &Jwk) -> bool {
    if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
        return false;
    }
    jwk.common
        .key_operations
        .as_ref()
        .is_none_or(|ops| ops.iter().any(|op| matches!(op, KeyOperations::Verify)))
}

/// Convert a JWK to a DecodingKey and the algorithm it verifies.
pub fn jwk_to_decoding_key(jwk: &Jwk) -> Result<(DecodingKey, Algorithm), AuthError> {
    let unsupported = |msg: String| AuthError::InvalidToken(InvalidTokenReason::UnsupportedKey(msg));

    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => {
            let key = DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
                .map_err(|e| unsupported(format!("RSA key: {e}")))?;

            let alg = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::RS384) => Algorithm::RS384,
                Some(KeyAlgorithm::RS512) => Algorithm::RS512,
                Some(KeyAlgorithm::PS256) => Algorithm::PS256,
                Some(KeyAlgorithm::PS384) => Algorithm::PS384,
                Some(KeyAlgorithm::PS512) => Algorithm::PS512,
                Some(KeyAlgorithm::RS256) | None => Algorithm::RS256,
                Some(other) => return Err(unsupported(format!("RSA key for {other:?}"))),
            };
            Ok((key, alg))
        }
        AlgorithmParameters::EllipticCurve(ec) => {
            let key = DecodingKey::from_ec_components(&ec.x, &ec.y)
                .map_err(|e| unsupported(format!("EC key: {e}")))?;

            let alg = match (jwk.common.key_algorithm, &ec.curve) {
                (Some(KeyAlgorithm::ES384), _) | (None, EllipticCurve::P384) => Algorithm::ES384,
                _ => Algorithm::ES256,
            };
            Ok((key, alg))
        }
        _ => Err(unsupported("key type is not RSA or EC".to_string())),
    }
}
