//! Checkout service.
//!
//! A checkout moves through three states:
//!
//! 1. `create_session` prices the cart, opens a hosted session at the
//!    provider and records a [`PendingCheckout`] under the provider's id.
//! 2. The customer pays. The success redirect calls `confirm` while Stripe
//!    separately delivers `checkout.session.completed` to `handle_webhook`.
//! 3. Whichever arrives first finalizes: the order is stored with
//!    create-if-absent semantics, the cart is cleared and the pending record
//!    is consumed. The other path gets the same order back and does nothing.

use thiserror::Error;
use url::Url;

use veltr_core::{CheckoutSessionId, CurrencyCode, Price, ShippingRateId, UserId};

use crate::catalog::Catalog;
use crate::db::{CartStore, OrderInsert, OrderStore, PendingCheckoutStore, RepositoryError};
use crate::models::{CartOwner, CartView, Order, PendingCheckout};
use crate::stripe::webhook::{CHECKOUT_SESSION_COMPLETED, WebhookEvent};
use crate::stripe::{
    CheckoutLineItem, CheckoutRequest, PaymentProvider, StripeError, WebhookError,
    WebhookVerifier,
};

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Stripe is not configured")]
    NotConfigured,

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Unknown shipping rate: {0}")]
    UnknownShippingRate(ShippingRateId),

    #[error("session_id query is required")]
    MissingSessionId,

    #[error("Checkout session not found")]
    SessionNotFound,

    #[error("Payment has not completed yet")]
    PaymentIncomplete,

    /// A price could not be expressed in minor units.
    #[error("amount out of range: {0}")]
    AmountOutOfRange(Price),

    /// The payment provider call failed.
    #[error("payment provider error: {0}")]
    Provider(#[from] StripeError),

    /// The webhook delivery was rejected.
    #[error(transparent)]
    Webhook(#[from] WebhookError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// A freshly opened hosted checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutStarted {
    pub session_id: CheckoutSessionId,
    /// Hosted payment page to redirect the customer to.
    pub url: Option<String>,
}

/// What a webhook delivery did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The event finalized a checkout, or found it already finalized.
    Finalized(OrderInsert),
    /// The event names a session this process never opened.
    UnknownSession(CheckoutSessionId),
    /// Not an event that finalizes anything.
    Ignored,
}

/// Checkout service.
pub struct CheckoutService<'a> {
    catalog: &'a Catalog,
    carts: &'a dyn CartStore,
    pending: &'a dyn PendingCheckoutStore,
    orders: &'a dyn OrderStore,
    frontend_url: &'a Url,
    provider: Option<&'a dyn PaymentProvider>,
    verifier: Option<&'a WebhookVerifier>,
}

impl<'a> CheckoutService<'a> {
    /// Create a checkout service with no provider or webhook secret.
    #[must_use]
    pub const fn new(
        catalog: &'a Catalog,
        carts: &'a dyn CartStore,
        pending: &'a dyn PendingCheckoutStore,
        orders: &'a dyn OrderStore,
        frontend_url: &'a Url,
    ) -> Self {
        Self {
            catalog,
            carts,
            pending,
            orders,
            frontend_url,
            provider: None,
            verifier: None,
        }
    }

    #[must_use]
    pub const fn with_provider(mut self, provider: Option<&'a dyn PaymentProvider>) -> Self {
        self.provider = provider;
        self
    }

    #[must_use]
    pub const fn with_webhook_verifier(mut self, verifier: Option<&'a WebhookVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    fn provider(&self) -> Result<&'a dyn PaymentProvider, CheckoutError> {
        self.provider.ok_or(CheckoutError::NotConfigured)
    }

    /// Open a hosted checkout for the user's current cart.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::NotConfigured` without a provider,
    /// `CheckoutError::EmptyCart` for an empty cart,
    /// `CheckoutError::UnknownShippingRate` for a rate outside the catalog and
    /// `CheckoutError::Provider` if the provider call fails.
    #[tracing::instrument(skip(self))]
    pub async fn create_session(
        &self,
        user_id: UserId,
        shipping_rate_id: Option<&str>,
    ) -> Result<CheckoutStarted, CheckoutError> {
        let provider = self.provider()?;

        let entries = self.carts.get(&CartOwner::User(user_id)).await?;
        let cart = CartView::price(&entries, self.catalog);
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let rate = match shipping_rate_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => {
                let id = ShippingRateId::new(id);
                let rate = self
                    .catalog
                    .shipping_rate(&id)
                    .ok_or(CheckoutError::UnknownShippingRate(id))?;
                Some(rate)
            }
            None => None,
        };
        let shipping = rate.map_or(Price::ZERO, |rate| rate.price);

        let mut line_items = cart
            .items
            .iter()
            .map(|line| {
                Ok(CheckoutLineItem {
                    name: line.name.clone(),
                    description: Some(line.name.clone()),
                    unit_amount: minor_units(line.price)?,
                    quantity: line.qty.get(),
                })
            })
            .collect::<Result<Vec<_>, CheckoutError>>()?;

        if let Some(rate) = rate.filter(|rate| rate.price.is_positive()) {
            line_items.push(CheckoutLineItem {
                name: format!("Shipping: {}", rate.label),
                description: None,
                unit_amount: minor_units(rate.price)?,
                quantity: 1,
            });
        }

        let request = CheckoutRequest {
            currency: CurrencyCode::USD,
            line_items,
            success_url: self.frontend_link("/checkout/success?session_id={CHECKOUT_SESSION_ID}"),
            cancel_url: self.frontend_link("/checkout/cancel"),
            client_reference_id: Some(user_id.to_string()),
        };

        let session = provider.create_checkout_session(&request).await?;

        self.pending
            .insert(PendingCheckout::new(
                session.id.clone(),
                user_id,
                cart,
                rate.map(|rate| rate.id.clone()),
                shipping,
            ))
            .await?;

        tracing::info!(session_id = %session.id, "checkout session created");
        Ok(CheckoutStarted {
            session_id: session.id,
            url: session.url,
        })
    }

    /// Confirm a checkout after the success redirect.
    ///
    /// Returns the existing order when the session was already finalized.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::MissingSessionId` for a blank id,
    /// `CheckoutError::SessionNotFound` if the session is unknown or belongs
    /// to another user and `CheckoutError::PaymentIncomplete` if the provider
    /// does not report it paid.
    #[tracing::instrument(skip(self))]
    pub async fn confirm(
        &self,
        user_id: UserId,
        session_id: Option<&str>,
    ) -> Result<Order, CheckoutError> {
        let provider = self.provider()?;

        let session_id = session_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(CheckoutSessionId::new)
            .ok_or(CheckoutError::MissingSessionId)?;

        // Read pending before orders: finalize stores the order before it
        // consumes the pending record, so one of the two is always visible.
        let pending = self.pending.get(&session_id).await?;

        if let Some(order) = self.orders.get_by_session(&session_id).await? {
            if order.user_id == user_id {
                return Ok(order);
            }
            return Err(CheckoutError::SessionNotFound);
        }

        let pending = pending
            .filter(|pending| pending.user_id == user_id)
            .ok_or(CheckoutError::SessionNotFound)?;

        let session = provider.retrieve_checkout_session(&session_id).await?;
        if !session.payment_status.is_paid() {
            return Err(CheckoutError::PaymentIncomplete);
        }

        Ok(self.finalize(&pending).await?.into_order())
    }

    /// Verify and act on a Stripe webhook delivery.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Webhook` if no secret is configured, the
    /// signature is missing or invalid, or the body is not an event.
    #[tracing::instrument(skip_all)]
    pub async fn handle_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookOutcome, CheckoutError> {
        let verifier = self.verifier.ok_or(WebhookError::NotConfigured)?;
        let signature = signature.ok_or(WebhookError::MissingSignature)?;
        let event = verifier.construct_event(payload, signature)?;

        tracing::info!(event_id = %event.id, event_type = %event.event_type, "webhook received");
        self.apply_event(&event).await
    }

    async fn apply_event(&self, event: &WebhookEvent) -> Result<WebhookOutcome, CheckoutError> {
        if event.event_type != CHECKOUT_SESSION_COMPLETED {
            return Ok(WebhookOutcome::Ignored);
        }

        // Delayed payment methods complete unpaid and settle later
        if event.payment_status().is_some_and(|status| status != "paid") {
            tracing::info!(event_id = %event.id, "checkout completed without payment, ignoring");
            return Ok(WebhookOutcome::Ignored);
        }

        let Some(session_id) = event.object_id().map(CheckoutSessionId::new) else {
            tracing::warn!(event_id = %event.id, "checkout event without a session id");
            return Ok(WebhookOutcome::Ignored);
        };

        let pending = self.pending.get(&session_id).await?;

        if let Some(order) = self.orders.get_by_session(&session_id).await? {
            self.pending.take(&session_id).await?;
            return Ok(WebhookOutcome::Finalized(OrderInsert::Existing(order)));
        }

        match pending {
            Some(pending) => Ok(WebhookOutcome::Finalized(self.finalize(&pending).await?)),
            None => {
                tracing::warn!(session_id = %session_id, "webhook for unknown checkout session");
                Ok(WebhookOutcome::UnknownSession(session_id))
            }
        }
    }

    /// Turn a pending checkout into an order exactly once.
    ///
    /// Only the call that creates the order clears the cart.
    async fn finalize(&self, pending: &PendingCheckout) -> Result<OrderInsert, CheckoutError> {
        let outcome = self
            .orders
            .create_if_absent(Order::from(pending))
            .await?;

        if let OrderInsert::Created(order) = &outcome {
            self.carts.take(&CartOwner::User(order.user_id)).await?;
            tracing::info!(
                order_id = %order.id,
                session_id = %order.session_id,
                total = %order.total,
                "order created"
            );
        }
        self.pending.take(&pending.session_id).await?;

        Ok(outcome)
    }

    fn frontend_link(&self, path_and_query: &str) -> String {
        format!(
            "{}{path_and_query}",
            self.frontend_url.as_str().trim_end_matches('/')
        )
    }
}

fn minor_units(price: Price) -> Result<i64, CheckoutError> {
    price
        .minor_units()
        .ok_or(CheckoutError::AmountOutOfRange(price))
}
