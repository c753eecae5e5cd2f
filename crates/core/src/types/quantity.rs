//! Cart line quantities.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityError {
    /// Zero or negative quantities are not stored.
    #[error("qty must be a positive integer")]
    NotPositive,
    /// The quantity does not fit the storage type.
    #[error("qty is too large")]
    TooLarge,
}

/// A cart line quantity, always at least 1.
///
/// A line whose quantity would drop to zero is removed instead of stored, so
/// this type has no zero value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    /// A single unit.
    pub const ONE: Self = Self(1);

    /// Create a quantity from a signed integer.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError::NotPositive` for values below 1 and
    /// `QuantityError::TooLarge` for values above `u32::MAX`.
    pub fn new(value: i64) -> Result<Self, QuantityError> {
        if value < 1 {
            return Err(QuantityError::NotPositive);
        }
        u32::try_from(value)
            .map(Self)
            .map_err(|_| QuantityError::TooLarge)
    }

    /// Get the raw count.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Add two quantities, clamping at the largest representable count.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for u32 {
    fn from(qty: Quantity) -> Self {
        qty.0
    }
}
