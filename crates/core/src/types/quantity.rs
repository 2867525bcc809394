//! Cart line quantity.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityError {
    /// Zero or negative.
    #[error("quantity must be a positive integer (got {0})")]
    NotPositive(i64),
    /// Larger than the column can hold.
    #[error("quantity must be at most {max} (got {got})")]
    TooLarge {
        /// Maximum allowed quantity.
        max: i32,
        /// Rejected input.
        got: i64,
    },
}

/// A strictly positive line quantity.
///
/// Zero is not a valid quantity: removing a line is an explicit operation,
/// never a side effect of setting its quantity.
///
/// ```
/// use plated_core::Quantity;
///
/// assert_eq!(Quantity::new(3).unwrap().get(), 3);
/// assert!(Quantity::new(0).is_err());
/// assert!(Quantity::new(-2).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i32")]
pub struct Quantity(i32);

impl Quantity {
    /// Largest storable quantity (`INTEGER` column).
    pub const MAX: i32 = i32::MAX;

    /// Validate a raw quantity.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError::NotPositive` for zero or negative input and
    /// `QuantityError::TooLarge` above [`Quantity::MAX`].
    pub fn new(value: i64) -> Result<Self, QuantityError> {
        if value <= 0 {
            return Err(QuantityError::NotPositive(value));
        }
        i32::try_from(value)
            .map(Self)
            .map_err(|_| QuantityError::TooLarge {
                max: Self::MAX,
                got: value,
            })
    }

    /// The quantity as stored.
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }

    /// Add two quantities, returning `None` on overflow.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for i32 {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_and_negative() {
        assert_eq!(Quantity::new(0), Err(QuantityError::NotPositive(0)));
        assert_eq!(Quantity::new(-5), Err(QuantityError::NotPositive(-5)));
    }

    #[test]
    fn test_rejects_values_beyond_column_range() {
        let err = Quantity::new(i64::from(i32::MAX) + 1).unwrap_err();
        assert!(matches!(err, QuantityError::TooLarge { .. }));
    }

    #[test]
    fn test_checked_add() {
        let two = Quantity::new(2).unwrap();
        let three = Quantity::new(3).unwrap();
        assert_eq!(two.checked_add(three).unwrap().get(), 5);

        let max = Quantity::new(i64::from(i32::MAX)).unwrap();
        assert!(max.checked_add(two).is_none());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Quantity = serde_json::from_str("4").unwrap();
        assert_eq!(ok.get(), 4);
        assert!(serde_json::from_str::<Quantity>("0").is_err());
        assert_eq!(serde_json::to_string(&ok).unwrap(), "4");
    }
}
