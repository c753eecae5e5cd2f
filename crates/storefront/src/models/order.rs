//! Order and pending checkout types.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use veltr_core::{CheckoutSessionId, OrderId, OrderStatus, Price, ShippingRateId, UserId};

use super::cart::{CartLine, CartView};

/// How long a hosted checkout page stays payable at the provider.
pub const CHECKOUT_SESSION_LIFETIME_HOURS: i64 = 24;

/// A checkout session created at the provider but not yet paid.
///
/// Holds a snapshot of the priced cart so the eventual order reflects what
/// the customer saw at checkout, even if the cart changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCheckout {
    pub session_id: CheckoutSessionId,
    pub user_id: UserId,
    pub items: Vec<CartLine>,
    pub subtotal: Price,
    pub shipping_rate_id: Option<ShippingRateId>,
    pub shipping: Price,
    pub total: Price,
    pub created_at: DateTime<Utc>,
    /// When the provider stops accepting payment. Informational only, pending
    /// records are never evicted.
    pub expires_at: DateTime<Utc>,
}

impl PendingCheckout {
    /// Snapshot a priced cart for a freshly created provider session.
    #[must_use]
    pub fn new(
        session_id: CheckoutSessionId,
        user_id: UserId,
        cart: CartView,
        shipping_rate_id: Option<ShippingRateId>,
        shipping: Price,
    ) -> Self {
        let created_at = Utc::now();
        Self {
            session_id,
            user_id,
            total: cart.subtotal + shipping,
            subtotal: cart.subtotal,
            items: cart.items,
            shipping_rate_id,
            shipping,
            created_at,
            expires_at: created_at + Duration::hours(CHECKOUT_SESSION_LIFETIME_HOURS),
        }
    }
}

/// A paid order. Created at most once per checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub session_id: CheckoutSessionId,
    pub items: Vec<CartLine>,
    pub subtotal: Price,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_rate_id: Option<ShippingRateId>,
    pub shipping: Price,
    pub total: Price,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl From<&PendingCheckout> for Order {
    fn from(pending: &PendingCheckout) -> Self {
        Self {
            id: OrderId::generate(),
            user_id: pending.user_id,
            session_id: pending.session_id.clone(),
            items: pending.items.clone(),
            subtotal: pending.subtotal,
            shipping_rate_id: pending.shipping_rate_id.clone(),
            shipping: pending.shipping,
            total: pending.total,
            status: OrderStatus::Paid,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::models::cart::CartEntry;
    use veltr_core::{ProductId, Quantity};

    fn pending() -> PendingCheckout {
        let catalog = Catalog::seed().unwrap();
        let cart = CartView::price(
            &[CartEntry::new(
                ProductId::new("veltr-arc-stand"),
                Quantity::new(2).unwrap(),
            )],
            &catalog,
        );
        PendingCheckout::new(
            CheckoutSessionId::new("cs_test_123"),
            UserId::generate(),
            cart,
            Some(ShippingRateId::new("express")),
            Price::from_units(25),
        )
    }

    #[test]
    fn test_pending_totals() {
        let pending = pending();
        assert_eq!(pending.subtotal, Price::from_units(378));
        assert_eq!(pending.total, Price::from_units(403));
        assert!(pending.expires_at > pending.created_at);
    }

    #[test]
    fn test_order_from_pending() {
        let pending = pending();
        let order = Order::from(&pending);

        assert_eq!(order.user_id, pending.user_id);
        assert_eq!(order.session_id, pending.session_id);
        assert_eq!(order.items, pending.items);
        assert_eq!(order.total, pending.total);
        assert_eq!(order.status, OrderStatus::Paid);

        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["sessionId"], "cs_test_123");
        assert_eq!(json["status"], "paid");
        assert_eq!(json["shippingRateId"], "express");
    }
}
