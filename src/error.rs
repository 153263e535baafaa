// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Handler errors.
//!
//! Endpoints answer `{ "error": ... }`, except login, whose callers read
//! `{ "message": ... }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::models::MessageResponse;

/// JSON field carrying the error text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyShape {
    #[default]
    Error,
    Message,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub shape: BodyShape,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            shape: BodyShape::Error,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    /// Render as `{ "message": ... }`.
    pub fn as_message(mut self) -> Self {
        self.shape = BodyShape::Message;
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.shape {
            BodyShape::Error => (self.status, Json(json!({ "error": self.message }))).into_response(),
            BodyShape::Message => (
                self.status,
                Json(MessageResponse {
                    message: self.message,
                }),
            )
                .into_response(),
        }
    }
}
