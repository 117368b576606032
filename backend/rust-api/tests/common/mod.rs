#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use yett_api::{
    config::Config,
    create_router,
    models::UserRole,
    services::{auth_service::AuthService, AppState},
};

pub const PASSWORD: &str = "password123";
pub const ADMIN_EMAIL: &str = "admin@yett.test";

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
}

/// Full router over a fresh in-memory store with one admin account.
pub async fn create_test_app() -> TestApp {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let mut config = Config::for_memory("integration-test-secret");
    config.bcrypt_cost = 4;
    let state = Arc::new(AppState::in_memory(config));

    AuthService::from_state(&state)
        .create_user("Root Admin", ADMIN_EMAIL, PASSWORD, UserRole::Admin)
        .await
        .expect("Failed to seed admin");

    TestApp {
        router: create_router(state.clone()),
        state,
    }
}

/// Sends one request and returns the status with the parsed JSON body
/// (`Value::Null` when the body is empty or not JSON).
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// Registers a user and returns `(token, user id)`.
pub async fn register(app: &Router, name: &str, email: &str, role: &str) -> (String, String) {
    let (status, body) = send(
        app,
        "POST",
        "/api/register",
        None,
        Some(json!({
            "name": name,
            "email": email,
            "password": PASSWORD,
            "role": role,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");

    (
        body["token"].as_str().unwrap().to_string(),
        body["user"]["id"].as_str().unwrap().to_string(),
    )
}

pub async fn login(app: &Router, email: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/login",
        None,
        Some(json!({ "email": email, "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["token"].as_str().unwrap().to_string()
}

pub async fn admin_token(app: &Router) -> String {
    login(app, ADMIN_EMAIL).await
}

/// Creates a module as admin and returns its id.
pub async fn create_module(app: &Router, admin: &str, title: &str, duration: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/modules",
        Some(admin),
        Some(json!({
            "title": title,
            "description": format!("All about {}", title),
            "contentUrl": "https://www.youtube.com/watch?v=abc123",
            "duration": duration,
            "difficulty": "Beginner",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "module create failed: {body}");
    body["id"].as_str().unwrap().to_string()
}
