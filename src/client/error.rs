// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

/// Client-side failures. Every one of them ends in a cleared session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("identity endpoint refused the credential ({0})")]
    Unauthorized(u16),

    #[error("identity endpoint unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("identity provider error: {0}")]
    Federated(String),

    #[error("credential storage failed: {0}")]
    Storage(String),

    #[error("not supported: {0}")]
    Unsupported(String),
}

impl ClientError {
    /// The identity endpoint answered 401 or 403.
    pub fn is_rejection(&self) -> bool {
        matches!(self, ClientError::Unauthorized(_))
    }
}
