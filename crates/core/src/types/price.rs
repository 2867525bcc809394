//! Non-negative catalog price using decimal arithmetic.

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input string is empty.
    #[error("price cannot be empty")]
    Empty,
    /// The input is not a decimal number.
    #[error("price must be a decimal number (got {0:?})")]
    NotANumber(String),
    /// The input is below zero.
    #[error("price cannot be negative")]
    Negative,
    /// The input does not fit the `NUMERIC(10,2)` column.
    #[error("price must be at most {0}")]
    TooLarge(Decimal),
    /// More decimal places than the column stores.
    #[error("price cannot have more than 2 decimal places")]
    TooPrecise,
}

/// Decimal places kept by the `NUMERIC(10,2)` column.
const MAX_SCALE: u32 = 2;

/// A catalog price in the store's single currency.
///
/// Stored as `NUMERIC(10,2)`; serialized as a decimal string so no
/// precision is lost on the wire.
///
/// ```
/// use plated_core::Price;
///
/// assert_eq!(Price::parse("12.50").unwrap().to_string(), "12.50");
/// assert!(Price::parse("-1").is_err());
/// assert!(Price::parse("twelve").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Largest value a `NUMERIC(10,2)` column accepts.
    /// 99999999.99, i.e. mantissa 9_999_999_999 = 2 * 2^32 + 1_410_065_407.
    pub const MAX: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

    /// Parse a price from user input.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, not a decimal number, negative,
    /// larger than [`Price::MAX`], or has more than two significant decimal
    /// places.
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PriceError::Empty);
        }

        let amount = Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map_err(|_| PriceError::NotANumber(trimmed.to_owned()))?;

        Self::from_decimal(amount)
    }

    /// Validate an already-decoded amount.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is negative, larger than [`Price::MAX`],
    /// or would be rounded by the store. Trailing zeros (`"4.500"`) are fine.
    pub fn from_decimal(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        if amount > Self::MAX {
            return Err(PriceError::TooLarge(Self::MAX));
        }
        if amount.normalize().scale() > MAX_SCALE {
            return Err(PriceError::TooPrecise);
        }
        Ok(Self(amount))
    }

    /// The underlying amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::from_decimal(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
