//! Type-safe price representation using decimal arithmetic.
//!
//! Catalog prices are stored in the currency's major unit (e.g., dollars)
//! as [`Decimal`] values. The payment collaborator bills in minor units
//! (cents), so [`Price::minor_units`] performs the only major-to-minor
//! conversion in the codebase: round to whole cents first, then multiply by
//! the currency's minor-unit scale.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Errors that can occur when converting a price to minor units.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceError {
    /// The amount is zero or negative; nothing chargeable.
    #[error("price amount must be positive, got {0}")]
    NotPositive(Decimal),
    /// The amount does not fit in an `i64` once scaled to minor units.
    #[error("price amount {0} overflows minor-unit representation")]
    Overflow(Decimal),
}

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's major unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    /// Convert to minor currency units (cents) for the payment collaborator.
    ///
    /// Rounds to two decimal places (half away from zero) before scaling, so
    /// a two-decimal catalog price converts exactly: `50.00` becomes `5000`.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::NotPositive`] for zero or negative amounts and
    /// [`PriceError::Overflow`] if the scaled value exceeds `i64`.
    pub fn minor_units(&self) -> Result<i64, PriceError> {
        if self.amount <= Decimal::ZERO {
            return Err(PriceError::NotPositive(self.amount));
        }

        self.amount
            .round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|cents| cents.to_i64())
            .ok_or(PriceError::Overflow(self.amount))
    }

    /// Format for display (e.g., "$19.99").
    #[must_use]
    pub fn display(&self) -> String {
        format!("{}{:.2}", self.currency.symbol(), self.amount)
    }
}

/// ISO 4217 currency codes accepted at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Currency symbol for display.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "\u{20ac}",
            Self::GBP => "\u{a3}",
        }
    }

    /// Lowercase code as the payment collaborator's API expects it.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::USD => "usd",
            Self::EUR => "eur",
            Self::GBP => "gbp",
            Self::CAD => "cad",
            Self::AUD => "aud",
        }
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "usd" => Ok(Self::USD),
            "eur" => Ok(Self::EUR),
            "gbp" => Ok(Self::GBP),
            "cad" => Ok(Self::CAD),
            "aud" => Ok(Self::AUD),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_minor_units_exact_two_decimals() {
        let price = Price::new(Decimal::new(5000, 2), CurrencyCode::USD);
        assert_eq!(price.minor_units().unwrap(), 5000);
    }

    #[test]
    fn test_minor_units_rounds_to_cents_first() {
        // 19.999 rounds to 20.00 before scaling, never to 1999.9
        let price = Price::new(Decimal::new(19999, 3), CurrencyCode::USD);
        assert_eq!(price.minor_units().unwrap(), 2000);

        let price = Price::new(Decimal::new(10994, 3), CurrencyCode::USD);
        assert_eq!(price.minor_units().unwrap(), 1099);
    }

    #[test]
    fn test_minor_units_rejects_zero_and_negative() {
        let zero = Price::new(Decimal::ZERO, CurrencyCode::USD);
        assert!(matches!(
            zero.minor_units(),
            Err(PriceError::NotPositive(_))
        ));

        let negative = Price::new(Decimal::new(-150, 2), CurrencyCode::USD);
        assert!(matches!(
            negative.minor_units(),
            Err(PriceError::NotPositive(_))
        ));
    }

    #[test]
    fn test_minor_units_overflow() {
        let price = Price::new(Decimal::MAX, CurrencyCode::USD);
        assert!(matches!(price.minor_units(), Err(PriceError::Overflow(_))));
    }

    #[test]
    fn test_display() {
        let price = Price::new(Decimal::new(1999, 2), CurrencyCode::USD);
        assert_eq!(price.display(), "$19.99");

        let price = Price::new(Decimal::new(5, 0), CurrencyCode::GBP);
        assert_eq!(price.display(), "\u{a3}5.00");
    }

    #[test]
    fn test_currency_code_parse() {
        assert_eq!("usd".parse::<CurrencyCode>().unwrap(), CurrencyCode::USD);
        assert_eq!("EUR".parse::<CurrencyCode>().unwrap(), CurrencyCode::EUR);
        assert!("doubloons".parse::<CurrencyCode>().is_err());
    }

    #[test]
    fn test_currency_code_for_api() {
        assert_eq!(CurrencyCode::USD.code(), "usd");
        assert_eq!(CurrencyCode::USD.to_string(), "usd");
    }
}
