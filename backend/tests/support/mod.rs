#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, Response, StatusCode},
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use signet_backend::{
    config::Config, handlers, middleware, state::AppState, store::InMemoryAuthStore,
};

pub const TEST_SECRET: &str = "test-secret-test-secret-test-secret!";
pub const TEST_ISSUER: &str = "signet-test";
pub const TEST_AUDIENCE: &str = "signet-test-clients";

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        jwt_secret: TEST_SECRET.to_string(),
        jwt_issuer: TEST_ISSUER.to_string(),
        jwt_audience: TEST_AUDIENCE.to_string(),
        device_validity_days: 90,
    }
}

pub fn test_state() -> (AppState, Arc<InMemoryAuthStore>) {
    let store = Arc::new(InMemoryAuthStore::new());
    let state = AppState::new(store.clone(), test_config());
    (state, store)
}

/// The application's route set over the given state, without the outer
/// CORS/Trace layers the server adds in main.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login));

    let protected_routes = Router::new()
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/me", get(handlers::account::me))
        .route("/api/me", put(handlers::account::update))
        .route("/api/me", delete(handlers::account::delete))
        .route("/api/me/devices", get(handlers::devices::list_devices))
        .route(
            "/api/me/devices/{id}",
            delete(handlers::devices::revoke_device),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(axum_middleware::from_fn(middleware::request_id::request_id))
        .with_state(state)
}

pub async fn send_json(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    fingerprint: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    if let Some(fingerprint) = fingerprint {
        builder = builder.header(header::USER_AGENT, fingerprint);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("build request"),
        None => builder.body(Body::empty()).expect("build request"),
    };
    app.clone().oneshot(request).await.expect("send request")
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse json body")
}

/// Registers an account through the API and returns (token, account id).
pub async fn register(
    app: &Router,
    username: &str,
    email: &str,
    password: &str,
    fingerprint: &str,
) -> (String, String) {
    let response = send_json(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(fingerprint),
        Some(json!({
            "username": username,
            "email": email,
            "password": password,
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    (
        body["token"].as_str().expect("token").to_string(),
        body["account"]["id"].as_str().expect("account id").to_string(),
    )
}

/// Logs in through the API and returns the issued token.
pub async fn login(app: &Router, identity: &str, password: &str, fingerprint: &str) -> String {
    let response = send_json(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(fingerprint),
        Some(json!({ "identity": identity, "password": password })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    body["token"].as_str().expect("token").to_string()
}
