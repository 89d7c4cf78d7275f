//! HTTP integration tests driving the router in-process

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokengate_core::services::entitlement::DevelopmentGateway;
use tokengate_core::{Database, DayBoundary, PlanCatalog};
use tokengate_server::{create_router, AppState};
use tower::ServiceExt;

const SECRET: &[u8] = b"integration-test-secret-integration-test-secret";

async fn test_app() -> (Router, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db = Database::open(dir.path().join("test.db"))
        .await
        .expect("Failed to create test database");

    let state = AppState::new(
        &db,
        PlanCatalog::built_in(),
        Arc::new(DevelopmentGateway::new()),
        SECRET.to_vec(),
        DayBoundary::Utc,
    );
    (create_router(state), dir)
}

async fn send(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn register_and_login(app: &Router, username: &str) -> String {
    let (status, _) = send(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "username": username, "password": "pa55word", "name": "Test" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": username, "password": "pa55word" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let (app, _dir) = test_app().await;
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_status_requires_authentication() {
    let (app, _dir) = test_app().await;

    let (status, _) = send(&app, "GET", "/api/tokens/status", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/tokens/status", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cookie_credentials_are_accepted() {
    let (app, _dir) = test_app().await;
    let token = register_and_login(&app, "alice").await;

    let request = Request::builder()
        .uri("/api/tokens/status")
        .header(header::COOKIE, format!("theme=dark; auth_token={}", token))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_new_user_status() {
    let (app, _dir) = test_app().await;
    let token = register_and_login(&app, "alice").await;

    let (status, body) = send(&app, "GET", "/api/tokens/status", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dailyLimit"], 10);
    assert_eq!(body["usedToday"], 0);
    assert_eq!(body["remaining"], 10);
    assert_eq!(body["totalUsed"], 0);
    assert_eq!(body["plan"], "basic");
    assert_eq!(body["status"], "active");
}

#[tokio::test]
async fn test_consume_until_quota_exceeded() {
    let (app, _dir) = test_app().await;
    let token = register_and_login(&app, "alice").await;

    for expected in (0..10).rev() {
        let (status, body) = send(
            &app,
            "POST",
            "/api/tokens/consume",
            Some(&token),
            Some(json!({ "operation": "species_recognition" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["tokensRemaining"], expected);
    }

    let (status, body) = send(&app, "POST", "/api/tokens/consume", Some(&token), None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["success"], false);
    assert_eq!(body["tokensRemaining"], 0);
}

#[tokio::test]
async fn test_plans_listing_is_public() {
    let (app, _dir) = test_app().await;
    let (status, body) = send(&app, "GET", "/api/subscription/plans", None, None).await;

    assert_eq!(status, StatusCode::OK);
    let plans = body["plans"].as_array().unwrap();
    assert_eq!(plans.len(), 3);
    assert_eq!(plans[0]["planId"], "basic");
    assert_eq!(plans[2]["dailyTokenAllowance"], -1);
}

#[tokio::test]
async fn test_checkout_verify_and_replay() {
    let (app, _dir) = test_app().await;
    let token = register_and_login(&app, "alice").await;

    let (status, order) = send(
        &app,
        "POST",
        "/api/payment/create-order",
        Some(&token),
        Some(json!({ "planId": "pro" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["amount"], 399.0);
    let order_id = order["orderId"].as_str().unwrap().to_string();

    let (_, body) = send(&app, "GET", "/api/tokens/status", Some(&token), None).await;
    assert_eq!(body["status"], "pending");

    let verify = json!({
        "orderId": order_id,
        "paymentId": "pay_dev_1",
        "signature": "unused-in-development",
        "planId": "pro",
    });
    let (status, body) = send(&app, "POST", "/api/payment/verify", Some(&token), Some(verify.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["applied"], true);
    assert_eq!(body["plan"], "pro");

    // Duplicate callback delivery
    let (status, body) = send(&app, "POST", "/api/payment/verify", Some(&token), Some(verify)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied"], false);

    let (_, body) = send(&app, "GET", "/api/tokens/status", Some(&token), None).await;
    assert_eq!(body["dailyLimit"], 100);
    assert_eq!(body["status"], "active");

    let (_, body) = send(&app, "GET", "/api/payment/history", Some(&token), None).await;
    let payments = body["payments"].as_array().unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0]["status"], "completed");
}

#[tokio::test]
async fn test_verify_rejects_unknown_order() {
    let (app, _dir) = test_app().await;
    let token = register_and_login(&app, "alice").await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/payment/verify",
        Some(&token),
        Some(json!({
            "orderId": "mock_order_forged",
            "paymentId": "pay_x",
            "signature": "x",
            "planId": "enterprise",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(&app, "GET", "/api/tokens/status", Some(&token), None).await;
    assert_eq!(body["plan"], "basic");
}

#[tokio::test]
async fn test_upgrade_with_unconfirmed_payment() {
    let (app, _dir) = test_app().await;
    let token = register_and_login(&app, "alice").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/subscription/upgrade",
        Some(&token),
        Some(json!({ "planId": "pro", "paymentId": "pay_guess" })),
    )
    .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_cancel_checkout_and_downgrade() {
    let (app, _dir) = test_app().await;
    let token = register_and_login(&app, "alice").await;

    let (_, order) = send(
        &app,
        "POST",
        "/api/payment/create-order",
        Some(&token),
        Some(json!({ "planId": "enterprise" })),
    )
    .await;
    let order_id = order["orderId"].as_str().unwrap();

    let (status, _) = send(
        &app,
        "POST",
        "/api/payment/cancel",
        Some(&token),
        Some(json!({ "orderId": order_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "POST",
        "/api/payment/cancel",
        Some(&token),
        Some(json!({ "orderId": order_id })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "POST", "/api/subscription/downgrade", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["plan"], "basic");

    let (status, _) = send(
        &app,
        "POST",
        "/api/subscription/downgrade",
        Some(&token),
        Some(json!({ "planId": "pro" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_registration() {
    let (app, _dir) = test_app().await;
    register_and_login(&app, "alice").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "username": "alice", "password": "x", "name": "Again" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}
