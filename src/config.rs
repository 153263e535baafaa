// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values and the
//! typed [`GatewayConfig`] loaded once at startup. Nothing reads the
//! environment at request time: the selected [`AuthMode`] is handed to the
//! auth gate when it is constructed.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `KEYCLOAK_ENABLED` | Selects federated (Keycloak) verification | `false` |
//! | `KEYCLOAK_URL` | Keycloak base URL | Required when federated |
//! | `KEYCLOAK_REALM` | Keycloak realm name | Required when federated |
//! | `KEYCLOAK_CLIENT_ID` | Public client id for token refresh/logout | Optional |
//! | `JWKS_CACHE_TTL_SECS` | Signing key set cache TTL | `300` |
//! | `USERS_FILE` | JSON file seeding the user directory | Optional |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM certificate chain and key | Plain HTTP |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

pub const KEYCLOAK_ENABLED_ENV: &str = "KEYCLOAK_ENABLED";
pub const KEYCLOAK_URL_ENV: &str = "KEYCLOAK_URL";
pub const KEYCLOAK_REALM_ENV: &str = "KEYCLOAK_REALM";
pub const KEYCLOAK_CLIENT_ID_ENV: &str = "KEYCLOAK_CLIENT_ID";
pub const JWKS_CACHE_TTL_ENV: &str = "JWKS_CACHE_TTL_SECS";
pub const USERS_FILE_ENV: &str = "USERS_FILE";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_JWKS_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set when KEYCLOAK_ENABLED is on")]
    MissingFederatedSetting(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Connection settings for the Keycloak realm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedConfig {
    /// Keycloak base URL, e.g. `https://sso.example.com`
    pub base_url: Url,
    /// Realm name
    pub realm: String,
    /// Public client id (only the client-side refresh/logout needs it)
    pub client_id: Option<String>,
}

impl FederatedConfig {
    pub fn new(base_url: Url, realm: impl Into<String>) -> Self {
        Self {
            base_url,
            realm: realm.into(),
            client_id: None,
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// `<base>/realms/<realm>/protocol/openid-connect/<endpoint>`
    pub fn openid_connect_url(&self, endpoint: &str) -> Result<Url, ConfigError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ConfigError::Invalid {
                name: KEYCLOAK_URL_ENV,
                reason: "URL cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .extend(["realms", self.realm.as_str(), "protocol", "openid-connect", endpoint]);
        Ok(url)
    }

    /// JWKS endpoint of the realm.
    pub fn jwks_url(&self) -> Result<Url, ConfigError> {
        self.openid_connect_url("certs")
    }
}

/// Verification strategy, fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// Opaque token mapped directly to a user email.
    Simplified,
    /// Keycloak-issued JWT validated against the realm key set.
    Federated(FederatedConfig),
}

impl AuthMode {
    pub fn is_federated(&self) -> bool {
        matches!(self, AuthMode::Federated(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            AuthMode::Simplified => "simplified",
            AuthMode::Federated(_) => "federated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// PEM files for HTTPS serving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Complete startup configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub mode: AuthMode,
    pub jwks_cache_ttl: Duration,
    pub users_file: Option<PathBuf>,
    pub bind_addr: SocketAddr,
    pub tls: Option<TlsPaths>,
    pub log_format: LogFormat,
}

impl GatewayConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mode = if get(KEYCLOAK_ENABLED_ENV).is_some_and(|v| parse_flag(&v)) {
            let raw_url = get(KEYCLOAK_URL_ENV)
                .ok_or(ConfigError::MissingFederatedSetting(KEYCLOAK_URL_ENV))?;
            let base_url = Url::parse(&raw_url).map_err(|e| ConfigError::Invalid {
                name: KEYCLOAK_URL_ENV,
                reason: e.to_string(),
            })?;
            let realm = get(KEYCLOAK_REALM_ENV)
                .ok_or(ConfigError::MissingFederatedSetting(KEYCLOAK_REALM_ENV))?;

            let mut federated = FederatedConfig::new(base_url, realm);
            federated.client_id = get(KEYCLOAK_CLIENT_ID_ENV);
            // Surface a non-composable base URL at startup rather than per request.
            federated.jwks_url()?;
            AuthMode::Federated(federated)
        } else {
            AuthMode::Simplified
        };

        let jwks_cache_ttl = match get(JWKS_CACHE_TTL_ENV) {
            Some(raw) => Duration::from_secs(raw.parse().map_err(|_| ConfigError::Invalid {
                name: JWKS_CACHE_TTL_ENV,
                reason: format!("expected seconds, got {raw:?}"),
            })?),
            None => DEFAULT_JWKS_CACHE_TTL,
        };

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match get(PORT_ENV) {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::Invalid {
                name: PORT_ENV,
                reason: format!("expected a port number, got {raw:?}"),
            })?,
            None => DEFAULT_PORT,
        };
        let bind_addr: SocketAddr =
            format!("{host}:{port}")
                .parse()
                .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                    name: HOST_ENV,
                    reason: e.to_string(),
                })?;

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Invalid {
                    name: TLS_CERT_PATH_ENV,
                    reason: "TLS_CERT_PATH and TLS_KEY_PATH must be set together".to_string(),
                })
            }
        };

        let log_format = match get(LOG_FORMAT_ENV).as_deref() {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            mode,
            jwks_cache_ttl,
            users_file: get(USERS_FILE_ENV).map(PathBuf::from),
            bind_addr,
            tls,
            log_format,
        })
    }
}

/// Truthy values accepted for boolean flags.
fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<GatewayConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GatewayConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_to_simplified_mode() {
        let config = load(&[]).unwrap();
        assert_eq!(config.mode, AuthMode::Simplified);
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.jwks_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.tls.is_none());
    }

    #[test]
    fn flag_off_ignores_keycloak_settings() {
        let config = load(&[
            (KEYCLOAK_ENABLED_ENV, "false"),
            (KEYCLOAK_URL_ENV, "https://sso.example.com"),
        ])
        .unwrap();
        assert!(!config.mode.is_federated());
    }

    #[test]
    fn federated_mode_requires_realm() {
        let err = load(&[
            (KEYCLOAK_ENABLED_ENV, "true"),
            (KEYCLOAK_URL_ENV, "https://sso.example.com"),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingFederatedSetting(KEYCLOAK_REALM_ENV)
        ));
    }

    #[test]
    fn federated_mode_parses_settings() {
        let config = load(&[
            (KEYCLOAK_ENABLED_ENV, "TRUE"),
            (KEYCLOAK_URL_ENV, "https://sso.example.com/"),
            (KEYCLOAK_REALM_ENV, "tickets"),
            (KEYCLOAK_CLIENT_ID_ENV, "frontend"),
            (JWKS_CACHE_TTL_ENV, "60"),
        ])
        .unwrap();

        let AuthMode::Federated(federated) = config.mode else {
            panic!("expected federated mode");
        };
        assert_eq!(federated.realm, "tickets");
        assert_eq!(federated.client_id.as_deref(), Some("frontend"));
        assert_eq!(config.jwks_cache_ttl, Duration::from_secs(60));
    }

    #[test]
    fn jwks_url_is_composed_from_base_and_realm() {
        let federated =
            FederatedConfig::new(Url::parse("https://sso.example.com/auth/").unwrap(), "main");
        assert_eq!(
            federated.jwks_url().unwrap().as_str(),
            "https://sso.example.com/auth/realms/main/protocol/openid-connect/certs"
        );

        let bare = FederatedConfig::new(Url::parse("http://localhost:8081").unwrap(), "dev");
        assert_eq!(
            bare.jwks_url().unwrap().as_str(),
            "http://localhost:8081/realms/dev/protocol/openid-connect/certs"
        );
    }

    #[test]
    fn tls_paths_must_come_in_pairs() {
        assert!(load(&[(TLS_CERT_PATH_ENV, "/tmp/cert.pem")]).is_err());
        let config = load(&[
            (TLS_CERT_PATH_ENV, "/tmp/cert.pem"),
            (TLS_KEY_PATH_ENV, "/tmp/key.pem"),
        ])
        .unwrap();
        assert!(config.tls.is_some());
    }

    #[test]
    fn rejects_non_numeric_port() {
        assert!(matches!(
            load(&[(PORT_ENV, "http")]),
            Err(ConfigError::Invalid { name: PORT_ENV, .. })
        ));
    }
}
