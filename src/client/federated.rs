// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client side of the Keycloak integration.
//!
//! [`KeycloakClient`] holds the access/refresh token pair obtained by the
//! login redirect and keeps the access token fresh with the OIDC
//! `refresh_token` grant. Expiry is read from the token's `exp` claim
//! without verifying the signature: the gateway verifies, the client only
//! needs to know when to refresh.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;

use super::ClientError;
use crate::config::FederatedConfig;

/// Federated identity SDK as seen by the session controller.
pub trait FederatedClient: Send + Sync + 'static {
    /// Start the SDK. `Ok(true)` when it holds a usable access token.
    fn init(&self) -> impl Future<Output = Result<bool, ClientError>> + Send;

    /// Current access token.
    fn token(&self) -> impl Future<Output = Option<String>> + Send;

    /// Refresh when the access token expires within `min_validity`.
    /// `Ok(true)` when a refresh happened.
    fn update_token(
        &self,
        min_validity: Duration,
    ) -> impl Future<Output = Result<bool, ClientError>> + Send;

    /// End the provider session and forget the tokens.
    fn logout(&self) -> impl Future<Output = Result<(), ClientError>> + Send;
}

#[derive(Debug, Clone)]
struct TokenPair {
    access: String,
    refresh: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExpiryClaim {
    exp: i64,
}

/// Unverified `exp` of a JWT.
fn token_expiry(token: &str) -> Result<i64, ClientError> {
    jsonwebtoken::dangerous::insecure_decode::<ExpiryClaim>(token)
        .map(|data| data.claims.exp)
        .map_err(|e| ClientError::Federated(format!("access token claims: {e}")))
}

pub struct KeycloakClient {
    config: FederatedConfig,
    client_id: String,
    http: Client,
    tokens: RwLock<Option<TokenPair>>,
}

impl KeycloakClient {
    /// Fails when the config carries no client id.
    pub fn new(config: FederatedConfig) -> Result<Self, ClientError> {
        let client_id = config
            .client_id
            .clone()
            .ok_or_else(|| ClientError::Federated("KEYCLOAK_CLIENT_ID is not set".to_string()))?;
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| ClientError::Federated(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            client_id,
            http,
            tokens: RwLock::new(None),
        })
    }

    /// Seed the tokens returned by the login redirect.
    pub fn with_tokens(self, access: impl Into<String>, refresh: Option<String>) -> Self {
        Self {
            tokens: RwLock::new(Some(TokenPair {
                access: access.into(),
                refresh,
            })),
            ..self
        }
    }

    async fn refresh_grant(&self, refresh_token: &str) -> Result<TokenPair, ClientError> {
        let url = self
            .config
            .openid_connect_url("token")
            .map_err(|e| ClientError::Federated(e.to_string()))?;

        let mut form = HashMap::new();
        form.insert("grant_type", "refresh_token");
        form.insert("client_id", self.client_id.as_str());
        form.insert("refresh_token", refresh_token);

        let response = self
            .http
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(|e| ClientError::Federated(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Federated(format!(
                "token request returned {status}: {body}"
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Federated(format!("invalid token response: {e}")))?;

        if token_response.access_token.trim().is_empty() {
            return Err(ClientError::Federated(
                "token response did not include access_token".to_string(),
            ));
        }

        Ok(TokenPair {
            access: token_response.access_token,
            refresh: token_response
                .refresh_token
                .or_else(|| Some(refresh_token.to_string())),
        })
    }
}

impl FederatedClient for KeycloakClient {
    async fn init(&self) -> Result<bool, ClientError> {
        if self.tokens.read().await.is_none() {
            return Ok(false);
        }
        self.update_token(Duration::ZERO).await?;
        Ok(self.tokens.read().await.is_some())
    }

    async fn token(&self) -> Option<String> {
        self.tokens.read().await.as_ref().map(|t| t.access.clone())
    }

    async fn update_token(&self, min_validity: Duration) -> Result<bool, ClientError> {
        let Some(current) = self.tokens.read().await.clone() else {
            return Err(ClientError::Federated("no session to refresh".to_string()));
        };

        let exp = token_expiry(&current.access)?;
        let remaining = exp - chrono::Utc::now().timestamp();
        if remaining > min_validity.as_secs() as i64 {
            return Ok(false);
        }

        let Some(refresh_token) = current.refresh.as_deref() else {
            *self.tokens.write().await = None;
            return Err(ClientError::Federated(
                "access token expiring and no refresh token".to_string(),
            ));
        };

        match self.refresh_grant(refresh_token).await {
            Ok(pair) => {
                tracing::debug!(remaining_secs = remaining, "Access token refreshed");
                *self.tokens.write().await = Some(pair);
                Ok(true)
            }
            Err(e) => {
                *self.tokens.write().await = None;
                Err(e)
            }
        }
    }

    async fn logout(&self) -> Result<(), ClientError> {
        let Some(pair) = self.tokens.write().await.take() else {
            return Ok(());
        };
        let Some(refresh_token) = pair.refresh else {
            return Ok(());
        };

        let url = self
            .config
            .openid_connect_url("logout")
            .map_err(|e| ClientError::Federated(e.to_string()))?;
        let mut form = HashMap::new();
        form.insert("client_id", self.client_id.as_str());
        form.insert("refresh_token", refresh_token.as_str());

        let response = self
            .http
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(|e| ClientError::Federated(format!("logout request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ClientError::Federated(format!(
                "logout returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}
