// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Auth Gateway - dual-mode bearer authentication
//!
//! Resolves an HTTP bearer credential to an active user record, either by
//! decoding a simplified token or by verifying a Keycloak-issued JWT, and
//! ships the client-side session controller that consumes it.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Credential extraction, verification and the auth gate
//! - `client` - Client session controller, credential storage, route guard
//! - `store` - User directory

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;
