//! Status enums for orders and payments.

use serde::{Deserialize, Serialize};

/// Order status.
///
/// Orders are only ever created once payment is confirmed, so every stored
/// order starts out `Paid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Paid,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Paid => write!(f, "paid"),
        }
    }
}

/// Payment status of a hosted checkout session.
///
/// Maps to Stripe's `payment_status` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Unpaid,
    NoPaymentRequired,
}

impl PaymentStatus {
    /// Whether funds have been captured and the order may be finalized.
    #[must_use]
    pub const fn is_paid(&self) -> bool {
        matches!(self, Self::Paid)
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paid" => Ok(Self::Paid),
            "unpaid" => Ok(Self::Unpaid),
            "no_payment_required" => Ok(Self::NoPaymentRequired),
            _ => Err(format!("invalid payment status: {s}")),
        }
    }
}

/// Sort order for product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    /// Most recently added first.
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
}

impl std::str::FromStr for ProductSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" => Ok(Self::Newest),
            "price_asc" => Ok(Self::PriceAsc),
            "price_desc" => Ok(Self::PriceDesc),
            _ => Err("sort must be one of price_asc, price_desc, or newest".to_string()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_status_parse() {
        assert_eq!("paid".parse::<PaymentStatus>().unwrap(), PaymentStatus::Paid);
        assert!(!"unpaid".parse::<PaymentStatus>().unwrap().is_paid());
        assert!("bogus".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn test_product_sort_parse() {
        assert_eq!("price_asc".parse::<ProductSort>().unwrap(), ProductSort::PriceAsc);
        assert_eq!(ProductSort::default(), ProductSort::Newest);
        assert!("cheapest".parse::<ProductSort>().is_err());
    }

    #[test]
    fn test_order_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&OrderStatus::Paid).unwrap(), "\"paid\"");
    }
}
