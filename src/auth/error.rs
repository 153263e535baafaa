// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! Everything that fails before a claim reaches the user directory answers
//! `401`; everything at or after resolution answers `403`. `Unauthenticated`
//! (no such user) and `Forbidden` (inactive user) stay distinct internally
//! but share one message and code on the wire.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Why a federated token was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidTokenReason {
    /// Not a decodable JWT
    Malformed,
    /// `exp` is in the past
    Expired,
    /// `nbf` is in the future
    NotYetValid,
    /// Signature does not verify against the selected key
    BadSignature,
    /// No key in the set matches the token's `kid`
    NoMatchingKey,
    /// Token `alg` differs from the algorithm of the selected key
    AlgorithmMismatch,
    /// Key set entry cannot be used for verification
    UnsupportedKey(String),
    /// Any other validation failure
    Other(String),
}

impl std::fmt::Display for InvalidTokenReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidTokenReason::Malformed => write!(f, "token is malformed"),
            InvalidTokenReason::Expired => write!(f, "token has expired"),
            InvalidTokenReason::NotYetValid => write!(f, "token is not yet valid"),
            InvalidTokenReason::BadSignature => write!(f, "token signature is invalid"),
            InvalidTokenReason::NoMatchingKey => write!(f, "no matching key found in JWKS"),
            InvalidTokenReason::AlgorithmMismatch => write!(f, "token algorithm does not match the key"),
            InvalidTokenReason::UnsupportedKey(msg) => write!(f, "unsupported signing key: {msg}"),
            InvalidTokenReason::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for InvalidTokenReason {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match e.kind() {
            ErrorKind::ExpiredSignature => InvalidTokenReason::Expired,
            ErrorKind::ImmatureSignature => InvalidTokenReason::NotYetValid,
            ErrorKind::InvalidSignature => InvalidTokenReason::BadSignature,
            ErrorKind::InvalidAlgorithm => InvalidTokenReason::AlgorithmMismatch,
            ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
                InvalidTokenReason::Malformed
            }
            _ => InvalidTokenReason::Other(e.to_string()),
        }
    }
}

/// Authentication error type.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No usable `Authorization: Bearer` header
    #[error("No credential provided")]
    MissingCredential,

    /// The realm key set could not be fetched or parsed
    #[error("Signing keys unavailable: {0}")]
    KeySetUnavailable(String),

    /// Token failed cryptographic or claim validation
    #[error("Invalid token: {0}")]
    InvalidToken(InvalidTokenReason),

    /// Verified token carries neither `email` nor `preferred_username`
    #[error("Token carries no identity claim")]
    ClaimMissing,

    /// Claim does not resolve to any user
    #[error("User is not authorized or is inactive")]
    Unauthenticated,

    /// Claim resolves to an inactive user
    #[error("User is not authorized or is inactive")]
    Forbidden,
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Public error code written to the response body.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "missing_credential",
            AuthError::KeySetUnavailable(_) => "key_set_unavailable",
            AuthError::InvalidToken(_) => "invalid_token",
            AuthError::ClaimMissing => "claim_missing",
            AuthError::Unauthenticated | AuthError::Forbidden => "forbidden",
        }
    }

    /// Internal kind, finer than [`error_code`](Self::error_code). For logs only.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::Unauthenticated => "unauthenticated",
            AuthError::Forbidden => "inactive_user",
            other => other.error_code(),
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingCredential
            | AuthError::KeySetUnavailable(_)
            | AuthError::InvalidToken(_)
            | AuthError::ClaimMissing => StatusCode::UNAUTHORIZED,
            AuthError::Unauthenticated | AuthError::Forbidden => StatusCode::FORBIDDEN,
        }
    }

    /// Whether a key set refetch could turn this failure into a success.
    pub fn may_be_key_rotation(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidToken(InvalidTokenReason::NoMatchingKey)
                | AuthError::InvalidToken(InvalidTokenReason::BadSignature)
        )
    }
}

impl From<InvalidTokenReason> for AuthError {
    fn from(reason: InvalidTokenReason) -> Self {
        AuthError::InvalidToken(reason)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
