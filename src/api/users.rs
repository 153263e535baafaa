// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::Json;

use crate::auth::Auth;
use crate::models::MeResponse;

/// Get the current authenticated user's information.
///
/// Works in both modes: the gate has already resolved the bearer credential
/// to an active directory record.
#[utoipa::path(
    get,
    path = "/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User information", body = MeResponse),
        (status = 401, description = "Missing credential or token failed verification"),
        (status = 403, description = "No active user for this credential"),
    )
)]
pub async fn get_current_user(Auth(user): Auth) -> Json<MeResponse> {
    Json(user.identity.into())
}
