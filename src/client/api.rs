// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP client for the gateway's identity endpoints.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use url::Url;

use super::ClientError;
use crate::models::{LoginRequest, LoginResponse, MeResponse, MessageResponse};

/// Identity endpoints the session controller talks to.
pub trait IdentityApi: Send + Sync + 'static {
    /// `GET /me` with the bearer token.
    fn whoami(&self, token: &str) -> impl Future<Output = Result<MeResponse, ClientError>> + Send;

    /// `POST /login`, returning the issued token.
    fn login(&self, email: &str) -> impl Future<Output = Result<String, ClientError>> + Send;
}

#[derive(Clone)]
pub struct HttpIdentityApi {
    base_url: Url,
    http: Client,
}

impl HttpIdentityApi {
    pub fn new(base_url: Url) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| {
                ClientError::UpstreamUnavailable(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self { base_url, http })
    }

    fn endpoint(&self, name: &str) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Unsupported(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .push(name);
        Ok(url)
    }
}

/// 401/403 become [`ClientError::Unauthorized`]; other failures mean the
/// endpoint could not give a usable answer.
async fn check_status(response: Response, what: &str) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ClientError::Unauthorized(status.as_u16()));
    }
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<MessageResponse>(&body)
        .map(|m| m.message)
        .unwrap_or(body);
    Err(ClientError::UpstreamUnavailable(format!(
        "{what} returned {status}: {detail}"
    )))
}

impl IdentityApi for HttpIdentityApi {
    async fn whoami(&self, token: &str) -> Result<MeResponse, ClientError> {
        let response = self
            .http
            .get(self.endpoint("me")?)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ClientError::UpstreamUnavailable(format!("GET /me failed: {e}")))?;

        check_status(response, "GET /me")
            .await?
            .json()
            .await
            .map_err(|e| ClientError::UpstreamUnavailable(format!("GET /me invalid JSON: {e}")))
    }

    async fn login(&self, email: &str) -> Result<String, ClientError> {
        let response = self
            .http
            .post(self.endpoint("login")?)
            .json(&LoginRequest {
                email: email.to_string(),
            })
            .send()
            .await
            .map_err(|e| ClientError::UpstreamUnavailable(format!("POST /login failed: {e}")))?;

        let body: LoginResponse = check_status(response, "POST /login")
            .await?
            .json()
            .await
            .map_err(|e| {
                ClientError::UpstreamUnavailable(format!("POST /login invalid JSON: {e}"))
            })?;
        Ok(body.token)
    }
}
