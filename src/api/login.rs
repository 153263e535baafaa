// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Simplified-mode login.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::auth::simplified::encode_token;
use crate::error::ApiError;
use crate::models::{LoginRequest, LoginResponse, MessageResponse};
use crate::state::AppState;

const DENIED_MESSAGE: &str = "Access denied for this email";

/// Exchange an email for a simplified bearer token.
///
/// The token is `base64("<email>:<nonce>")`, which the gate decodes back to
/// the email. Unknown and inactive users get the same answer.
#[utoipa::path(
    post,
    path = "/login",
    tag = "Users",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 400, description = "Malformed body, or federated mode", body = MessageResponse),
        (status = 403, description = "No active user for this email", body = MessageResponse),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    if state.is_federated() {
        return Err(
            ApiError::bad_request("Login is handled by the identity provider").as_message(),
        );
    }

    let Json(request) =
        payload.map_err(|e| ApiError::bad_request(e.body_text()).as_message())?;
    let email = request.email.trim();
    if email.is_empty() {
        return Err(ApiError::bad_request("email is required").as_message());
    }

    match state.gate.resolver().resolve(email) {
        Ok(identity) => {
            tracing::info!(user_id = %identity.id, "Issued simplified token");
            Ok(Json(LoginResponse {
                token: encode_token(&identity.email),
            }))
        }
        Err(e) => {
            tracing::debug!(%email, error_code = e.error_code(), "Login refused");
            Err(ApiError::forbidden(DENIED_MESSAGE).as_message())
        }
    }
}
