// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! This module defines the user record read from the directory and the
//! request/response structures of the REST API. Wire types derive
//! `Serialize`, `Deserialize`, and `ToSchema` for JSON handling and OpenAPI
//! documentation.
//!
//! ## Model Categories
//!
//! - **User Identity**: the directory record a verified claim resolves to
//! - **Who-am-I**: the `/me` payload (field names kept for existing clients)
//! - **Login**: simplified-mode token issuance

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

// =============================================================================
// User Identity
// =============================================================================

/// Activation status of a user record.
///
/// Stored as an integer: `1` is active, every other value is inactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum UserStatus {
    Active,
    Inactive(i64),
}

impl UserStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, UserStatus::Active)
    }
}

impl From<i64> for UserStatus {
    fn from(value: i64) -> Self {
        if value == 1 {
            UserStatus::Active
        } else {
            UserStatus::Inactive(value)
        }
    }
}

impl From<UserStatus> for i64 {
    fn from(value: UserStatus) -> Self {
        match value {
            UserStatus::Active => 1,
            UserStatus::Inactive(code) => code,
        }
    }
}

/// A user record from the directory.
///
/// `email` is the only key a verified claim is joined on.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UserIdentity {
    /// Opaque identifier; numeric ids in the users file are read as text
    #[serde(deserialize_with = "id_from_text_or_number")]
    pub id: String,
    /// Account name
    pub name: String,
    /// Display name
    #[serde(default)]
    pub display_name: Option<String>,
    /// Unique email address
    pub email: String,
    /// Role / job function
    #[serde(default)]
    pub role: Option<String>,
    /// Permission level
    #[serde(default)]
    pub permission_level: Option<String>,
    /// Activation status
    #[schema(value_type = i64)]
    pub status: UserStatus,
}

impl UserIdentity {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

fn id_from_text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(id) => id,
        RawId::Number(id) => id.to_string(),
    })
}

// =============================================================================
// Who-am-I
// =============================================================================

/// Response for `GET /me`.
///
/// Optional fields are always present and serialize as `null` when unset.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct MeResponse {
    pub id: String,
    pub name: String,
    /// Display name
    pub nome: Option<String>,
    pub email: String,
    pub role: Option<String>,
    /// Permission level
    pub acesso: Option<String>,
}

impl From<UserIdentity> for MeResponse {
    fn from(user: UserIdentity) -> Self {
        Self {
            id: user.id,
            name: user.name,
            nome: user.display_name,
            email: user.email,
            role: user.role,
            acesso: user.permission_level,
        }
    }
}

// =============================================================================
// Login
// =============================================================================

/// Request body for `POST /login`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
}

/// Successful response for `POST /login`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// Bearer token to present on subsequent requests
    pub token: String,
}

/// Failure body for `POST /login`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}
