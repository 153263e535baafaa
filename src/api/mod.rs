// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::{HeaderName, Uri},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::auth_middleware,
    error::ApiError,
    models::{LoginRequest, LoginResponse, MeResponse, MessageResponse},
    state::AppState,
};

pub mod health;
pub mod login;
pub mod users;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/me", get(users::get_current_user))
        .route_layer(axum::middleware::from_fn_with_state(
            state.gate.clone(),
            auth_middleware,
        ));

    let public = Router::new()
        .route("/login", post(login::login))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .merge(protected)
        .merge(public)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(request_id)),
        )
        .layer(CorsLayer::permissive())
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("no route for {}", uri.path()))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        users::get_current_user,
        login::login,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            MeResponse,
            LoginRequest,
            LoginResponse,
            MessageResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Users", description = "Identity of the bearer and simplified login"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::FederatedVerifier;
    use crate::test_support::{access_token, directory, jwks_json, FakeKeycloak, KEY_A};
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn simplified_app() -> Router {
        router(AppState::simplified(Arc::new(directory())))
    }

    async fn federated_app(server: &FakeKeycloak) -> Router {
        let verifier =
            FederatedVerifier::for_realm(&server.federated_config(), Duration::from_secs(300))
                .unwrap();
        router(AppState::federated(verifier, Arc::new(directory())))
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn login_request(body: &str) -> Request<Body> {
        Request::post("/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn me_request(token: Option<&str>) -> Request<Body> {
        let mut builder = Request::get("/me");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn login_then_me_round_trip() {
        let app = simplified_app();

        let response = app
            .clone()
            .oneshot(login_request(r#"{"email":"ana@example.com"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let token = body_json(response).await["token"]
            .as_str()
            .unwrap()
            .to_string();

        let response = app.oneshot(me_request(Some(&token))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["email"], "ana@example.com");
        assert_eq!(body["nome"], "Test User");
        assert_eq!(body["acesso"], "full");
    }

    #[tokio::test]
    async fn login_refuses_unknown_and_inactive_alike() {
        for email in ["bo@example.com", "nobody@example.com"] {
            let response = simplified_app()
                .oneshot(login_request(&json!({ "email": email }).to_string()))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::FORBIDDEN);
            assert_eq!(
                body_json(response).await,
                json!({ "message": "Access denied for this email" })
            );
        }
    }

    #[tokio::test]
    async fn login_rejects_malformed_body() {
        for body in ["not json", r#"{"mail":"x"}"#, r#"{"email":"  "}"#] {
            let response = simplified_app().oneshot(login_request(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert!(body_json(response).await["message"].is_string());
        }
    }

    #[tokio::test]
    async fn login_unavailable_in_federated_mode() {
        let server = FakeKeycloak::start(jwks_json(&[&KEY_A])).await;
        let response = federated_app(&server)
            .await
            .oneshot(login_request(r#"{"email":"ana@example.com"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["message"].is_string());
    }

    #[tokio::test]
    async fn me_requires_credential() {
        let response = simplified_app().oneshot(me_request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error_code"], "missing_credential");
    }

    #[tokio::test]
    async fn me_with_federated_token() {
        let server = FakeKeycloak::start(jwks_json(&[&KEY_A])).await;
        let token = access_token(&KEY_A, "ana@example.com", 300);

        let response = federated_app(&server)
            .await
            .oneshot(me_request(Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["email"], "ana@example.com");
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let response = simplified_app()
            .oneshot(Request::get("/health/live").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let response = simplified_app()
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await, json!({ "error": "no route for /nope" }));
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let response = simplified_app()
            .oneshot(
                Request::get("/api-doc/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["paths"]["/me"].is_object());
        assert!(body["paths"]["/login"].is_object());
    }
}
