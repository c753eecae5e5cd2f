//! Stripe REST client for Checkout Sessions.
//!
//! Stripe takes form-encoded request bodies with bracketed keys for nested
//! fields (`line_items[0][price_data][currency]=usd`) and authenticates with
//! the secret key as a bearer token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use url::Url;

use veltr_core::{CheckoutSessionId, PaymentStatus};

use super::{CheckoutRequest, PaymentProvider, ProviderSession, StripeError};
use crate::config::StripeConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    api_base: Url,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("api_base", &self.api_base.as_str())
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
    payment_status: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl StripeClient {
    /// Create a new Stripe API client.
    ///
    /// # Errors
    ///
    /// Returns error if the secret key is not a valid header value or the
    /// HTTP client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self, StripeError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.secret_key.expose_secret());
        let mut auth_header = HeaderValue::from_str(&auth_value)
            .map_err(|e| StripeError::Config(format!("Invalid API key format: {e}")))?;
        auth_header.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_header);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, StripeError> {
        self.api_base
            .join(path)
            .map_err(|e| StripeError::Config(format!("Invalid API base URL: {e}")))
    }

    async fn read_session(response: reqwest::Response) -> Result<ProviderSession, StripeError> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or(body);
            return Err(StripeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| StripeError::Parse(e.to_string()))?;
        session_from_response(session)
    }
}

#[async_trait]
impl PaymentProvider for StripeClient {
    #[tracing::instrument(skip(self, request), fields(lines = request.line_items.len()))]
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<ProviderSession, StripeError> {
        let url = self.endpoint("/v1/checkout/sessions")?;
        let response = self
            .client
            .post(url)
            .form(&checkout_form(request))
            .send()
            .await?;

        Self::read_session(response).await
    }

    #[tracing::instrument(skip(self), fields(session_id = %id))]
    async fn retrieve_checkout_session(
        &self,
        id: &CheckoutSessionId,
    ) -> Result<ProviderSession, StripeError> {
        let mut url = self.endpoint("/v1/checkout/sessions/")?;
        url.path_segments_mut()
            .map_err(|()| StripeError::Config("API base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push(id.as_str());

        let response = self.client.get(url).send().await?;
        Self::read_session(response).await
    }
}

fn session_from_response(session: SessionResponse) -> Result<ProviderSession, StripeError> {
    let payment_status = session
        .payment_status
        .parse::<PaymentStatus>()
        .map_err(StripeError::Parse)?;

    Ok(ProviderSession {
        id: CheckoutSessionId::new(session.id),
        url: session.url,
        payment_status,
    })
}

/// Flatten a checkout request into Stripe's bracketed form fields.
fn checkout_form(request: &CheckoutRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("payment_method_types[0]".to_string(), "card".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
    ];

    if let Some(reference) = &request.client_reference_id {
        form.push(("client_reference_id".to_string(), reference.clone()));
    }

    let currency = request.currency.as_stripe_code();
    for (i, item) in request.line_items.iter().enumerate() {
        let prefix = format!("line_items[{i}]");
        form.push((
            format!("{prefix}[price_data][currency]"),
            currency.to_string(),
        ));
        form.push((
            format!("{prefix}[price_data][product_data][name]"),
            item.name.clone(),
        ));
        if let Some(description) = &item.description {
            form.push((
                format!("{prefix}[price_data][product_data][description]"),
                description.clone(),
            ));
        }
        form.push((
            format!("{prefix}[price_data][unit_amount]"),
            item.unit_amount.to_string(),
        ));
        form.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
    }

    form
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        Form, Json, Router,
        extract::Path,
        http::{HeaderMap as AxumHeaders, StatusCode},
        routing::{get, post},
    };
    use secrecy::SecretString;
    use veltr_core::CurrencyCode;

    use super::*;
    use crate::stripe::CheckoutLineItem;

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            currency: CurrencyCode::USD,
            line_items: vec![
                CheckoutLineItem {
                    name: "VELTR Arc Charging Stand".to_string(),
                    description: Some("VELTR Arc Charging Stand".to_string()),
                    unit_amount: 18_900,
                    quantity: 2,
                },
                CheckoutLineItem {
                    name: "Shipping: Express".to_string(),
                    description: None,
                    unit_amount: 2_500,
                    quantity: 1,
                },
            ],
            success_url: "http://localhost:5173/checkout/success?session_id={CHECKOUT_SESSION_ID}"
                .to_string(),
            cancel_url: "http://localhost:5173/checkout/cancel".to_string(),
            client_reference_id: Some("user-1".to_string()),
        }
    }

    fn field<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
        form.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_checkout_form_fields() {
        let form = checkout_form(&request());

        assert_eq!(field(&form, "mode"), Some("payment"));
        assert_eq!(field(&form, "payment_method_types[0]"), Some("card"));
        assert_eq!(field(&form, "line_items[0][price_data][currency]"), Some("usd"));
        assert_eq!(field(&form, "line_items[0][price_data][unit_amount]"), Some("18900"));
        assert_eq!(field(&form, "line_items[0][quantity]"), Some("2"));
        assert_eq!(
            field(&form, "line_items[1][price_data][product_data][name]"),
            Some("Shipping: Express")
        );
        assert_eq!(
            field(&form, "line_items[1][price_data][product_data][description]"),
            None
        );
        assert_eq!(field(&form, "client_reference_id"), Some("user-1"));
    }

    #[test]
    fn test_session_from_response_rejects_unknown_status() {
        let result = session_from_response(SessionResponse {
            id: "cs_1".to_string(),
            url: None,
            payment_status: "mystery".to_string(),
        });
        assert!(matches!(result, Err(StripeError::Parse(_))));
    }

    async fn spawn_mock_stripe() -> Url {
        async fn create(
            headers: AxumHeaders,
            Form(form): Form<Vec<(String, String)>>,
        ) -> (StatusCode, Json<serde_json::Value>) {
            let authorized = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                == Some("Bearer sk_test_mock");
            if !authorized {
                return (
                    StatusCode::UNAUTHORIZED,
                    Json(serde_json::json!({"error": {"message": "Invalid API Key provided"}})),
                );
            }
            let lines = form
                .iter()
                .filter(|(k, _)| k.ends_with("[quantity]"))
                .count();
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "id": format!("cs_test_{lines}"),
                    "url": "https://checkout.stripe.com/c/pay/cs_test",
                    "payment_status": "unpaid"
                })),
            )
        }

        async fn retrieve(Path(id): Path<String>) -> (StatusCode, Json<serde_json::Value>) {
            if id == "cs_missing" {
                return (
                    StatusCode::NOT_FOUND,
                    Json(serde_json::json!({"error": {"message": "No such checkout.session"}})),
                );
            }
            (
                StatusCode::OK,
                Json(serde_json::json!({"id": id, "url": null, "payment_status": "paid"})),
            )
        }

        let app = Router::new()
            .route("/v1/checkout/sessions", post(create))
            .route("/v1/checkout/sessions/{id}", get(retrieve));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Url::parse(&format!("http://{addr}")).unwrap()
    }

    fn client(api_base: Url, key: &str) -> StripeClient {
        StripeClient::new(&StripeConfig {
            secret_key: SecretString::from(key),
            webhook_secret: None,
            api_base,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_retrieve_against_mock() {
        let base = spawn_mock_stripe().await;
        let stripe = client(base, "sk_test_mock");

        let created = stripe.create_checkout_session(&request()).await.unwrap();
        assert_eq!(created.id.as_str(), "cs_test_2");
        assert_eq!(created.payment_status, PaymentStatus::Unpaid);
        assert!(created.url.is_some());

        let fetched = stripe
            .retrieve_checkout_session(&CheckoutSessionId::new("cs_test_2"))
            .await
            .unwrap();
        assert_eq!(fetched.payment_status, PaymentStatus::Paid);
        assert_eq!(fetched.url, None);
    }

    #[tokio::test]
    async fn test_api_errors_surface_message() {
        let base = spawn_mock_stripe().await;

        let unauthorized = client(base.clone(), "sk_test_wrong")
            .create_checkout_session(&request())
            .await;
        match unauthorized {
            Err(StripeError::Api { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid API Key provided");
            }
            other => panic!("expected API error, got {other:?}"),
        }

        let missing = client(base, "sk_test_mock")
            .retrieve_checkout_session(&CheckoutSessionId::new("cs_missing"))
            .await;
        assert!(matches!(missing, Err(StripeError::Api { status: 404, .. })));
    }
}
