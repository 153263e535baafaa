// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer-token authentication with two interchangeable strategies, chosen
//! once at startup:
//!
//! - **Simplified**: the token is an email, or base64 of `email:secret`
//! - **Federated**: the token is a Keycloak JWT verified against the realm JWKS
//!
//! ## Auth Flow
//!
//! 1. Client sends `Authorization: Bearer <token>`
//! 2. The gate extracts the token (missing → 401)
//! 3. The configured strategy turns it into an identity claim
//!    (federated verification failure → 401)
//! 4. The claim is resolved by exact email match against the user directory
//!    (unknown or inactive user → 403)
//! 5. The resolved user is attached to the request for handlers
//!
//! ## Security
//!
//! - JWKS is cached with TTL and refetched once on suspected key rotation
//! - Clock skew tolerance is 60 seconds
//! - Unknown and inactive users are indistinguishable on the wire

pub mod claims;
pub mod error;
pub mod extractor;
pub mod federated;
pub mod jwks;
pub mod middleware;
pub mod resolver;
pub mod simplified;

pub use claims::{AuthenticatedUser, CredentialKind};
pub use error::{AuthError, InvalidTokenReason};
pub use extractor::Auth;
pub use federated::FederatedVerifier;
pub use jwks::JwksManager;
pub use middleware::{auth_middleware, AuthGate, Strategy};
pub use resolver::IdentityResolver;
