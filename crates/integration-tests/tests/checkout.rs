//! Checkout API: session creation, redirect confirmation, webhooks and
//! order history.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;
use veltr_integration_tests::{TestApp, sign_now};

async fn user_with_cart(app: &TestApp, email: &str) -> String {
    let token = app.register(email).await;
    let cart = app
        .put(
            "/api/cart",
            Some(&token),
            &json!({ "items": [
                { "productId": "veltr-echo-earbuds", "qty": 2 },
                { "productId": "veltr-arc-stand", "qty": 1 }
            ] }),
        )
        .await;
    assert_eq!(cart.status, StatusCode::OK);
    token
}

async fn start_checkout(app: &TestApp, token: &str) -> String {
    let response = app
        .post(
            "/api/checkout/session",
            Some(token),
            &json!({ "shippingRateId": "express" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert!(response.body["url"].as_str().unwrap().starts_with("https://"));
    app.payments.last_session_id()
}

#[tokio::test]
async fn test_session_uses_catalog_prices() {
    let app = TestApp::new();
    let token = user_with_cart(&app, "lines@example.com").await;

    start_checkout(&app, &token).await;

    let request = app.payments.last_request();
    let amounts: Vec<(i64, u32)> = request
        .line_items
        .iter()
        .map(|line| (line.unit_amount, line.quantity))
        .collect();
    assert_eq!(amounts, [(39_900, 2), (18_900, 1), (2_500, 1)]);
    assert!(
        request
            .success_url
            .ends_with("/checkout/success?session_id={CHECKOUT_SESSION_ID}")
    );
}

#[tokio::test]
async fn test_session_errors() {
    let app = TestApp::new();
    let token = app.register("nocart@example.com").await;

    let empty = app.post("/api/checkout/session", Some(&token), &json!({})).await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
    assert_eq!(empty.error(), "Cart is empty");

    let token = user_with_cart(&app, "badrate@example.com").await;
    let rate = app
        .post(
            "/api/checkout/session",
            Some(&token),
            &json!({ "shippingRateId": "teleport" }),
        )
        .await;
    assert_eq!(rate.status, StatusCode::BAD_REQUEST);
    assert_eq!(rate.error(), "Unknown shipping rate: teleport");

    let anonymous = app.post("/api/checkout/session", None, &json!({})).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_without_stripe() {
    let app = TestApp::without_payments();
    let token = user_with_cart(&app, "nostripe@example.com").await;

    let response = app.post("/api/checkout/session", Some(&token), &json!({})).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.error(), "Stripe is not configured");
}

#[tokio::test]
async fn test_confirm_before_payment() {
    let app = TestApp::new();
    let token = user_with_cart(&app, "early@example.com").await;
    let session_id = start_checkout(&app, &token).await;

    let response = app
        .get(
            &format!("/api/checkout/confirm?session_id={session_id}"),
            Some(&token),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error(), "Payment has not completed yet");

    let cart = app.get("/api/cart", Some(&token)).await;
    assert_eq!(cart.body["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_confirm_query_errors() {
    let app = TestApp::new();
    let token = app.register("query@example.com").await;

    let missing = app.get("/api/checkout/confirm", Some(&token)).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.error(), "session_id query is required");

    let unknown = app
        .get("/api/checkout/confirm?session_id=cs_test_missing", Some(&token))
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
    assert_eq!(unknown.error(), "Checkout session not found");
}

#[tokio::test]
async fn test_confirm_creates_order_once() {
    let app = TestApp::new();
    let token = user_with_cart(&app, "paid@example.com").await;
    let session_id = start_checkout(&app, &token).await;
    app.payments.mark_paid(&session_id);

    let uri = format!("/api/checkout/confirm?session_id={session_id}");
    let first = app.get(&uri, Some(&token)).await;
    assert_eq!(first.status, StatusCode::OK, "{}", first.body);
    let order = &first.body["order"];
    assert_eq!(order["sessionId"], session_id.as_str());
    assert_eq!(order["subtotal"].as_f64(), Some(2.0 * 399.0 + 189.0));
    assert_eq!(order["shipping"].as_f64(), Some(25.0));
    assert_eq!(order["total"].as_f64(), Some(2.0 * 399.0 + 189.0 + 25.0));
    assert_eq!(order["status"], "paid");

    let cart = app.get("/api/cart", Some(&token)).await;
    assert!(cart.body["items"].as_array().unwrap().is_empty());

    let again = app
        .get(
            &format!("/api/checkout/confirm?sessionId={session_id}"),
            Some(&token),
        )
        .await;
    assert_eq!(again.status, StatusCode::OK);
    assert_eq!(again.body["order"]["id"], order["id"]);

    let orders = app.get("/api/orders", Some(&token)).await;
    assert_eq!(orders.body["orders"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_webhook_then_confirm_yield_one_order() {
    let app = TestApp::new();
    let token = user_with_cart(&app, "hook@example.com").await;
    let session_id = start_checkout(&app, &token).await;
    app.payments.mark_paid(&session_id);

    let delivered = app.deliver_completed(&session_id).await;
    assert_eq!(delivered.status, StatusCode::OK);
    assert_eq!(delivered.body, json!({ "received": true }));

    let cart = app.get("/api/cart", Some(&token)).await;
    assert!(cart.body["items"].as_array().unwrap().is_empty());

    let confirmed = app
        .get(
            &format!("/api/checkout/confirm?session_id={session_id}"),
            Some(&token),
        )
        .await;
    assert_eq!(confirmed.status, StatusCode::OK);

    let redelivered = app.deliver_completed(&session_id).await;
    assert_eq!(redelivered.status, StatusCode::OK);

    let orders = app.get("/api/orders", Some(&token)).await;
    let orders = orders.body["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["id"], confirmed.body["order"]["id"]);
}

#[tokio::test]
async fn test_orders_are_private() {
    let app = TestApp::new();
    let buyer = user_with_cart(&app, "buyer@example.com").await;
    let session_id = start_checkout(&app, &buyer).await;
    app.payments.mark_paid(&session_id);
    app.deliver_completed(&session_id).await;

    let other = app.register("other@example.com").await;
    let orders = app.get("/api/orders", Some(&other)).await;
    assert!(orders.body["orders"].as_array().unwrap().is_empty());

    let confirm = app
        .get(
            &format!("/api/checkout/confirm?session_id={session_id}"),
            Some(&other),
        )
        .await;
    assert_eq!(confirm.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_webhook_rejections() {
    let app = TestApp::new();
    let payload = br#"{"id":"evt_x","type":"checkout.session.completed","data":{"object":{"id":"cs_test_1"}}}"#;

    let unsigned = app.deliver_webhook(payload, None).await;
    assert_eq!(unsigned.status, StatusCode::BAD_REQUEST);
    assert_eq!(unsigned.error(), "Missing signature");

    let forged = app
        .deliver_webhook(payload, Some("t=1760000000,v1=deadbeef"))
        .await;
    assert_eq!(forged.status, StatusCode::BAD_REQUEST);
    assert!(forged.error().starts_with("Webhook error: "));

    let tampered = app
        .deliver_webhook(b"{\"type\":\"other\"}", Some(&sign_now(payload)))
        .await;
    assert_eq!(tampered.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_webhook_acknowledges_other_events() {
    let app = TestApp::new();
    let payload = br#"{"id":"evt_y","type":"payment_intent.created","data":{"object":{"id":"pi_1"}}}"#;

    let response = app.deliver_webhook(payload, Some(&sign_now(payload))).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["received"], true);
}

#[tokio::test]
async fn test_webhook_without_secret() {
    let app = TestApp::without_payments();
    let payload = br#"{"type":"checkout.session.completed"}"#;

    let response = app.deliver_webhook(payload, Some(&sign_now(payload))).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error(), "Webhook endpoint not configured");
}
