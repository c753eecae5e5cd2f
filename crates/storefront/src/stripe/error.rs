//! Stripe error types.

use thiserror::Error;

/// Errors that can occur when talking to the Stripe API.
#[derive(Debug, Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse a response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The client could not be built from configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Errors that can occur while verifying a webhook delivery.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// No webhook signing secret is configured.
    #[error("Webhook endpoint not configured")]
    NotConfigured,

    /// The `Stripe-Signature` header is absent.
    #[error("Missing signature")]
    MissingSignature,

    /// The header has no timestamp or no `v1` signature.
    #[error("Unable to extract timestamp and signatures from header")]
    MalformedHeader,

    /// The signed timestamp is too far from the current time.
    #[error("Timestamp outside the tolerance zone")]
    TimestampOutsideTolerance,

    /// No `v1` signature matched the payload.
    #[error("No signatures found matching the expected signature for payload")]
    SignatureMismatch,

    /// The verified body is not a Stripe event.
    #[error("Invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}
