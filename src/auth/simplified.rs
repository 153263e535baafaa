// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Simplified-mode token decoding.
//!
//! A simplified token is either a plain email address or a standard
//! (padded) base64 blob of `email:secret`. Decoding never fails: anything
//! that is not strict base64 of UTF-8 text is taken verbatim as the claim.

use base64ct::{Base64, Encoding};

/// Outcome of decoding a simplified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedClaim {
    /// Token was base64; claim is the decoded text up to the first `:`.
    Decoded(String),
    /// Token was not base64 (or not UTF-8 once decoded); claim is the token itself.
    Raw(String),
}

impl DecodedClaim {
    pub fn claim(&self) -> &str {
        match self {
            DecodedClaim::Decoded(c) | DecodedClaim::Raw(c) => c,
        }
    }

    pub fn into_claim(self) -> String {
        match self {
            DecodedClaim::Decoded(c) | DecodedClaim::Raw(c) => c,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, DecodedClaim::Raw(_))
    }
}

/// Extract the candidate email from a simplified token.
pub fn decode_token(token: &str) -> DecodedClaim {
    let decoded = Base64::decode_vec(token)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok());

    match decoded {
        Some(text) => {
            let claim = match text.split_once(':') {
                Some((email, _secret)) => email.to_string(),
                None => text,
            };
            DecodedClaim::Decoded(claim)
        }
        None => DecodedClaim::Raw(token.to_string()),
    }
}

/// Issue a simplified token for `email` carrying a random secret.
pub fn encode_token(email: &str) -> String {
    let secret = uuid::Uuid::new_v4().simple().to_string();
    Base64::encode_string(format!("{email}:{secret}").as_bytes())
}
