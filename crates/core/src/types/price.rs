//! Type-safe price representation using decimal arithmetic.
//!
//! The backend sends prices as plain JSON numbers (`80`, `27.5`), so `Price`
//! reads and writes them as numbers while keeping exact decimal arithmetic
//! for totals.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, Mul};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A monetary amount in the store's single currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Price {
    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from an amount in cents.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// The decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

/// Error returned when parsing a [`Price`] from text.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    #[error("invalid price: {0}")]
    Invalid(String),
    #[error("price cannot be negative")]
    Negative,
}

impl core::str::FromStr for Price {
    type Err = PriceError;

    /// Parse `110`, `110.50` or `$110.50`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let amount: Decimal = trimmed
            .strip_prefix('$')
            .unwrap_or(trimmed)
            .parse()
            .map_err(|_| PriceError::Invalid(s.to_string()))?;
        if amount.is_sign_negative() {
            return Err(PriceError::Negative);
        }
        Ok(Self(amount))
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Mul<u32> for Price {
    type Output = Self;

    /// Price of `rhs` units at this unit price.
    fn mul(self, rhs: u32) -> Self {
        Self(self.0 * Decimal::from(rhs))
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_input() {
        assert_eq!("$40.00".parse::<Price>().unwrap(), Price::from_cents(4000));
        assert_eq!(" 12.5 ".parse::<Price>().unwrap(), Price::from_cents(1250));
        assert_eq!("-1".parse::<Price>().unwrap_err(), PriceError::Negative);
        assert!("ten".parse::<Price>().is_err());
    }

    #[test]
    fn test_display_two_decimals() {
        assert_eq!(Price::from_cents(11000).to_string(), "$110.00");
        assert_eq!(Price::from_cents(2550).to_string(), "$25.50");
    }

    #[test]
    fn test_deserialize_integer_and_float() {
        let whole: Price = serde_json::from_str("80").unwrap();
        assert_eq!(whole, Price::from_cents(8000));

        let fractional: Price = serde_json::from_str("27.5").unwrap();
        assert_eq!(fractional, Price::from_cents(2750));
    }

    #[test]
    fn test_sum_of_line_totals() {
        let total: Price = [Price::from_cents(8000) * 1, Price::from_cents(1500) * 2]
            .into_iter()
            .sum();
        assert_eq!(total, Price::from_cents(11000));
    }
}
