//! Auth API: registration, login and bearer token handling.

#![allow(clippy::unwrap_used)]

use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::json;
use veltr_integration_tests::TestApp;

#[tokio::test]
async fn test_register_returns_user_and_token() {
    let app = TestApp::new();

    let response = app
        .post(
            "/api/auth/register",
            None,
            &json!({ "name": "Ada Park", "email": " Ada@Example.com ", "password": "long-enough-1" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["user"]["name"], "Ada Park");
    assert_eq!(response.body["user"]["email"], "ada@example.com");
    assert!(response.body["user"]["id"].is_string());
    assert!(response.body["user"].get("passwordHash").is_none());
    assert!(response.body["token"].as_str().unwrap().len() > 20);
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let app = TestApp::new();
    app.register("dup@example.com").await;

    let response = app
        .post(
            "/api/auth/register",
            None,
            &json!({ "name": "Other", "email": "DUP@example.com", "password": "another-pass-9" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.error(), "Email is already registered");
}

#[tokio::test]
async fn test_register_validation() {
    let app = TestApp::new();

    let missing = app
        .post("/api/auth/register", None, &json!({ "email": "a@b.co" }))
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.error(), "Name, email, and password are required");

    let short = app
        .post(
            "/api/auth/register",
            None,
            &json!({ "name": "Short", "email": "short@example.com", "password": "abc" }),
        )
        .await;
    assert_eq!(short.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = TestApp::new();
    app.register("known@example.com").await;

    let wrong_password = app
        .post(
            "/api/auth/login",
            None,
            &json!({ "email": "known@example.com", "password": "not-the-password" }),
        )
        .await;
    let unknown_email = app
        .post(
            "/api/auth/login",
            None,
            &json!({ "email": "nobody@example.com", "password": "quiet-bass-2041" }),
        )
        .await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.body, unknown_email.body);
    assert_eq!(wrong_password.error(), "Invalid credentials");

    let blank = app.post("/api/auth/login", None, &json!({})).await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);
    assert_eq!(blank.error(), "Email and password are required");
}

#[tokio::test]
async fn test_login_then_me() {
    let app = TestApp::new();
    app.register("me@example.com").await;

    let login = app
        .post(
            "/api/auth/login",
            None,
            &json!({ "email": "ME@example.com", "password": "quiet-bass-2041" }),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
    let token = login.body["token"].as_str().unwrap();

    let me = app.get("/api/auth/me", Some(token)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["user"]["email"], "me@example.com");
    assert_eq!(me.body["user"]["id"], login.body["user"]["id"]);
}

#[tokio::test]
async fn test_bearer_errors() {
    let app = TestApp::new();

    let missing = app.get("/api/auth/me", None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.error(), "Missing authorization header");

    let basic = app
        .dispatch(
            Request::builder()
                .method(Method::GET)
                .uri("/api/auth/me")
                .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(basic.status, StatusCode::UNAUTHORIZED);
    assert_eq!(basic.error(), "Invalid authorization format");

    let forged = app.get("/api/auth/me", Some("not.a.jwt")).await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);
    assert_eq!(forged.error(), "Invalid or expired token");
}

#[tokio::test]
async fn test_malformed_json_is_a_bad_request() {
    let app = TestApp::new();

    let response = app
        .dispatch(
            Request::builder()
                .method(Method::POST)
                .uri("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(!response.error().is_empty());
}

#[tokio::test]
async fn test_login_is_rate_limited_per_client() {
    let app = TestApp::with_rate_limits();
    let credentials = json!({ "email": "nobody@example.com", "password": "wrong-password-1" });

    let mut statuses = Vec::new();
    for _ in 0..8 {
        let response = app
            .send_from("203.0.113.9", Method::POST, "/api/auth/login", Some(&credentials))
            .await;
        if response.status == StatusCode::TOO_MANY_REQUESTS {
            assert_eq!(response.error(), "Too many requests");
        } else {
            assert_eq!(response.error(), "Invalid credentials");
        }
        statuses.push(response.status);
    }

    assert!(statuses[..5].iter().all(|s| *s == StatusCode::UNAUTHORIZED));
    assert!(statuses[5..].iter().all(|s| *s == StatusCode::TOO_MANY_REQUESTS));

    // Another client has its own budget
    let other = app
        .send_from("198.51.100.20", Method::POST, "/api/auth/login", Some(&credentials))
        .await;
    assert_eq!(other.status, StatusCode::UNAUTHORIZED);
}
