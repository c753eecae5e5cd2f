//! In-process harness for VELTR storefront API tests.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p veltr-integration-tests
//! ```
//!
//! Requests go straight through the full router (middleware included) with
//! `tower::ServiceExt::oneshot`; no socket is bound. Stripe is replaced by
//! [`FakePayments`], and webhook deliveries are signed with
//! [`WEBHOOK_SECRET`] exactly as Stripe would sign them.
//!
//! # Test Categories
//!
//! - `catalog` - Health, categories, listing and detail
//! - `auth` - Registration, login and bearer handling
//! - `cart` - Server-priced carts, merge and guest carts
//! - `checkout` - Sessions, confirmation, webhooks and orders

// Test support: setup failures should panic with context.
#![allow(clippy::expect_used, clippy::missing_panics_doc)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;
use url::Url;

use veltr_core::{CheckoutSessionId, PaymentStatus};
use veltr_storefront::catalog::Catalog;
use veltr_storefront::config::{StorefrontConfig, StripeConfig};
use veltr_storefront::state::AppState;
use veltr_storefront::stripe::webhook::{CHECKOUT_SESSION_COMPLETED, SIGNATURE_HEADER, sign_payload};
use veltr_storefront::stripe::{CheckoutRequest, PaymentProvider, ProviderSession, StripeError};

/// Signing secret shared by the harness and the app under test.
pub const WEBHOOK_SECRET: &str = "whsec_it_4Rk9mXq2Lz7v";

/// Stand-in for Stripe Checkout.
///
/// Sessions are numbered `cs_test_1`, `cs_test_2`, ... and stay unpaid until
/// [`FakePayments::mark_paid`] is called.
#[derive(Debug, Default)]
pub struct FakePayments {
    requests: Mutex<Vec<CheckoutRequest>>,
    paid: Mutex<HashSet<String>>,
}

impl FakePayments {
    /// Mark a session as paid.
    pub fn mark_paid(&self, session_id: &str) {
        self.paid
            .lock()
            .expect("paid lock")
            .insert(session_id.to_string());
    }

    /// Id of the most recently created session.
    pub fn last_session_id(&self) -> String {
        let count = self.requests.lock().expect("requests lock").len();
        assert!(count > 0, "no checkout session was created");
        format!("cs_test_{count}")
    }

    /// The most recent checkout request sent to the provider.
    pub fn last_request(&self) -> CheckoutRequest {
        self.requests
            .lock()
            .expect("requests lock")
            .last()
            .cloned()
            .expect("no checkout session was created")
    }
}

#[async_trait]
impl PaymentProvider for FakePayments {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<ProviderSession, StripeError> {
        let mut requests = self.requests.lock().expect("requests lock");
        requests.push(request.clone());
        let id = format!("cs_test_{}", requests.len());
        Ok(ProviderSession {
            url: Some(format!("https://checkout.stripe.test/c/pay/{id}")),
            id: CheckoutSessionId::new(id),
            payment_status: PaymentStatus::Unpaid,
        })
    }

    async fn retrieve_checkout_session(
        &self,
        id: &CheckoutSessionId,
    ) -> Result<ProviderSession, StripeError> {
        let paid = self.paid.lock().expect("paid lock").contains(id.as_str());
        Ok(ProviderSession {
            id: id.clone(),
            url: None,
            payment_status: if paid {
                PaymentStatus::Paid
            } else {
                PaymentStatus::Unpaid
            },
        })
    }
}

/// A status and decoded JSON body.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestResponse {
    /// The `error` message of an error body.
    pub fn error(&self) -> &str {
        self.body["error"]
            .as_str()
            .unwrap_or_else(|| panic!("expected an error body, got {}", self.body))
    }
}

/// The storefront app wired to in-memory stores and [`FakePayments`].
pub struct TestApp {
    router: Router,
    pub payments: Arc<FakePayments>,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    /// App with payments and webhooks configured.
    pub fn new() -> Self {
        let mut config = StorefrontConfig::development();
        config.stripe = Some(StripeConfig {
            secret_key: SecretString::from("sk_test_it_unused"),
            webhook_secret: Some(SecretString::from(WEBHOOK_SECRET)),
            api_base: Url::parse("https://api.stripe.test").expect("valid url"),
        });

        let payments = Arc::new(FakePayments::default());
        let provider: Arc<dyn PaymentProvider> = payments.clone();
        let state = AppState::builder(config, Catalog::seed().expect("seed catalog"))
            .payments(Some(provider))
            .build();

        Self {
            router: veltr_storefront::app(state),
            payments,
        }
    }

    /// App with no Stripe configuration at all.
    pub fn without_payments() -> Self {
        let state = AppState::builder(
            StorefrontConfig::development(),
            Catalog::seed().expect("seed catalog"),
        )
        .build();

        Self {
            router: veltr_storefront::app(state),
            payments: Arc::new(FakePayments::default()),
        }
    }

    /// App with per-IP rate limiting switched on.
    ///
    /// Requests need a client address; use [`TestApp::send_from`].
    pub fn with_rate_limits() -> Self {
        let mut config = StorefrontConfig::development();
        config.rate_limit = true;
        let state = AppState::builder(config, Catalog::seed().expect("seed catalog")).build();

        Self {
            router: veltr_storefront::app(state),
            payments: Arc::new(FakePayments::default()),
        }
    }

    /// Send a request as if forwarded by a proxy for client `ip`.
    pub async fn send_from(
        &self,
        ip: &str,
        method: Method,
        uri: &str,
        body: Option<&Value>,
    ) -> TestResponse {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", ip);
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.dispatch(request.body(body).expect("valid request"))
            .await
    }

    /// Send a request, optionally with a bearer token and JSON body.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> TestResponse {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.dispatch(request.body(body).expect("valid request"))
            .await
    }

    /// Send a fully built request.
    pub async fn dispatch(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("JSON body")
        };

        TestResponse { status, body }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: &Value) -> TestResponse {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: &Value) -> TestResponse {
        self.send(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: &Value) -> TestResponse {
        self.send(Method::PATCH, uri, token, Some(body)).await
    }

    /// Register a user and return their bearer token.
    pub async fn register(&self, email: &str) -> String {
        let response = self
            .post(
                "/api/auth/register",
                None,
                &serde_json::json!({
                    "name": "Rowan Vale",
                    "email": email,
                    "password": "quiet-bass-2041",
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "register: {}", response.body);

        response.body["token"]
            .as_str()
            .expect("token in register response")
            .to_string()
    }

    /// Deliver a signed `checkout.session.completed` event for `session_id`.
    pub async fn deliver_completed(&self, session_id: &str) -> TestResponse {
        let payload = serde_json::json!({
            "id": format!("evt_{session_id}"),
            "type": CHECKOUT_SESSION_COMPLETED,
            "data": { "object": { "id": session_id, "payment_status": "paid" } },
        })
        .to_string();

        self.deliver_webhook(payload.as_bytes(), Some(&sign_now(payload.as_bytes())))
            .await
    }

    /// Deliver a raw webhook body with an optional signature header.
    pub async fn deliver_webhook(&self, payload: &[u8], signature: Option<&str>) -> TestResponse {
        let mut request = Request::builder()
            .method(Method::POST)
            .uri("/api/webhooks/stripe")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(signature) = signature {
            request = request.header(SIGNATURE_HEADER, signature);
        }

        self.dispatch(request.body(Body::from(payload.to_vec())).expect("valid request"))
            .await
    }
}

/// Sign `payload` with [`WEBHOOK_SECRET`] at the current time.
pub fn sign_now(payload: &[u8]) -> String {
    sign_payload(WEBHOOK_SECRET, chrono::Utc::now().timestamp(), payload)
}
