//! Stripe payment bridge.
//!
//! # Modules
//!
//! - [`client`] - REST client for Checkout Sessions
//! - [`webhook`] - `Stripe-Signature` verification and event parsing
//!
//! Services talk to the provider through [`PaymentProvider`] so tests can
//! substitute a fake and so checkout can run without Stripe configured.

pub mod client;
mod error;
pub mod webhook;

use async_trait::async_trait;

use veltr_core::{CheckoutSessionId, CurrencyCode, PaymentStatus};

pub use client::StripeClient;
pub use error::{StripeError, WebhookError};
pub use webhook::{WebhookEvent, WebhookVerifier};

/// One line on the hosted checkout page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLineItem {
    pub name: String,
    pub description: Option<String>,
    /// Price per unit in minor units (cents).
    pub unit_amount: i64,
    pub quantity: u32,
}

/// Parameters for a new hosted checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub currency: CurrencyCode,
    pub line_items: Vec<CheckoutLineItem>,
    pub success_url: String,
    pub cancel_url: String,
    /// Our user id, echoed back by Stripe for reconciliation.
    pub client_reference_id: Option<String>,
}

/// A checkout session as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSession {
    pub id: CheckoutSessionId,
    /// Hosted payment page; absent once the session is complete or expired.
    pub url: Option<String>,
    pub payment_status: PaymentStatus,
}

/// A hosted-checkout payment provider.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a hosted checkout session.
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<ProviderSession, StripeError>;

    /// Fetch the current state of a checkout session.
    async fn retrieve_checkout_session(
        &self,
        id: &CheckoutSessionId,
    ) -> Result<ProviderSession, StripeError>;
}
