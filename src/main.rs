// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Duration;

use auth_gateway::{
    api::router,
    auth::FederatedVerifier,
    config::{AuthMode, GatewayConfig, LogFormat, DEFAULT_LOG_FILTER},
    state::AppState,
    store::{InMemoryUserStore, UserDirectory},
};
use axum_server::tls_rustls::RustlsConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = GatewayConfig::from_env().expect("Invalid configuration");
    init_tracing(config.log_format);

    let directory: Arc<dyn UserDirectory> = match &config.users_file {
        Some(path) => {
            let store = InMemoryUserStore::load_json(path).expect("Failed to load users file");
            tracing::info!(users = store.len(), path = %path.display(), "User directory loaded");
            Arc::new(store)
        }
        None => {
            tracing::warn!("USERS_FILE not set, user directory is empty");
            Arc::new(InMemoryUserStore::new())
        }
    };

    let state = match &config.mode {
        AuthMode::Simplified => AppState::simplified(directory),
        AuthMode::Federated(federated) => {
            let verifier = FederatedVerifier::for_realm(federated, config.jwks_cache_ttl)
                .expect("Failed to set up federated verifier");
            tracing::info!(jwks_url = %verifier.jwks().jwks_url(), "Federated verification enabled");
            AppState::federated(verifier, directory)
        }
    };
    tracing::info!(mode = config.mode.name(), "Auth gate configured");

    let app = router(state);
    let addr = config.bind_addr;

    let handle = axum_server::Handle::new();
    tokio::spawn({
        let handle = handle.clone();
        async move {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received");
            handle.graceful_shutdown(Some(Duration::from_secs(10)));
        }
    });

    match &config.tls {
        Some(tls) => {
            // Install the ring crypto provider for rustls (must be done before any TLS operations)
            rustls::crypto::ring::default_provider()
                .install_default()
                .expect("Failed to install rustls crypto provider");

            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key)
                .await
                .expect("Failed to load TLS certificate");

            tracing::info!(%addr, "Auth gateway listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .expect("HTTPS server failed");
        }
        None => {
            tracing::info!(%addr, "Auth gateway listening on http (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .expect("HTTP server failed");
        }
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
