//! Stripe webhook signature verification.
//!
//! Stripe signs each delivery with the endpoint secret:
//!
//! ```text
//! Stripe-Signature: t=1700000000,v1=<hex hmac>,v1=<hex hmac>
//! ```
//!
//! where each `v1` is `HMAC-SHA256(secret, "{t}.{raw body}")`. More than one
//! `v1` appears while a secret is being rolled. The body must be verified
//! byte for byte, before any JSON parsing.

use chrono::Utc;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::WebhookError;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Maximum age of a signed timestamp, in seconds.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Event type that finalizes an order.
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// A verified Stripe event.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

/// The `data` envelope of an event.
#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

impl WebhookEvent {
    /// The `id` of the event's data object (the session id for checkout events).
    #[must_use]
    pub fn object_id(&self) -> Option<&str> {
        self.data.object.get("id").and_then(serde_json::Value::as_str)
    }

    /// The object's `payment_status`, when it has one.
    #[must_use]
    pub fn payment_status(&self) -> Option<&str> {
        self.data
            .object
            .get("payment_status")
            .and_then(serde_json::Value::as_str)
    }
}

/// Verifies webhook deliveries against the endpoint secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: SecretString,
    tolerance_secs: i64,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("secret", &"[REDACTED]")
            .field("tolerance_secs", &self.tolerance_secs)
            .finish()
    }
}

impl WebhookVerifier {
    #[must_use]
    pub const fn new(secret: SecretString) -> Self {
        Self {
            secret,
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    /// Override the timestamp tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    /// Verify the signature header and parse the event.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError` if the header is malformed, stale, does not
    /// match, or the body is not an event.
    pub fn construct_event(
        &self,
        payload: &[u8],
        header: &str,
    ) -> Result<WebhookEvent, WebhookError> {
        self.verify_at(payload, header, Utc::now().timestamp())?;
        Ok(serde_json::from_slice(payload)?)
    }

    /// Verify the signature header as of `now` (unix seconds).
    ///
    /// # Errors
    ///
    /// Returns `WebhookError` if the header is malformed, stale, or no `v1`
    /// signature matches.
    pub fn verify_at(&self, payload: &[u8], header: &str, now: i64) -> Result<(), WebhookError> {
        let (timestamp, signatures) = parse_header(header)?;

        // `t` is unauthenticated and may be any i64
        if now.abs_diff(timestamp) > self.tolerance_secs.unsigned_abs() {
            return Err(WebhookError::TimestampOutsideTolerance);
        }

        let expected = compute_signature(self.secret.expose_secret(), timestamp, payload);
        let matched = signatures
            .iter()
            .any(|candidate| bool::from(expected.as_bytes().ct_eq(candidate.as_bytes())));

        if matched {
            Ok(())
        } else {
            Err(WebhookError::SignatureMismatch)
        }
    }
}

fn parse_header(header: &str) -> Result<(i64, Vec<&str>), WebhookError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse::<i64>().ok(),
            "v1" => signatures.push(value),
            _ => {}
        }
    }

    match timestamp {
        Some(t) if !signatures.is_empty() => Ok((t, signatures)),
        _ => Err(WebhookError::MalformedHeader),
    }
}

fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    // HMAC accepts keys of any length
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return String::new();
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Build a `Stripe-Signature` header value for `payload`.
///
/// Used by the `veltr webhook sign` command and tests to produce deliveries
/// the endpoint will accept.
#[must_use]
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    format!(
        "t={timestamp},v1={}",
        compute_signature(secret, timestamp, payload)
    )
}
