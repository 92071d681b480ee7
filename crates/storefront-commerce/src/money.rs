//! Money type for representing monetary values.
//!
//! Amounts are held as integers in the currency's minor unit (paise for INR).
//! Intermediate pricing arithmetic uses exact decimals and is rounded back to
//! minor units with round-half-up only when presented.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CommerceError;

/// Supported currencies.
///
/// A shop prices everything in one currency; the others exist so a
/// deployment can pick its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Currency {
    #[default]
    INR,
    USD,
    EUR,
    GBP,
    JPY,
}

impl Currency {
    /// Get the currency code (e.g., "INR").
    pub fn code(&self) -> &'static str {
        match self {
            Currency::INR => "INR",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::JPY => "JPY",
        }
    }

    /// Get the currency symbol (e.g., "₹").
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::INR => "\u{20b9}",
            Currency::USD => "$",
            Currency::EUR => "\u{20ac}",
            Currency::GBP => "\u{00a3}",
            Currency::JPY => "\u{00a5}",
        }
    }

    /// Get the number of decimal places for this currency.
    pub fn decimal_places(&self) -> u32 {
        match self {
            Currency::JPY => 0,
            _ => 2,
        }
    }

    /// Parse a currency code string.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "INR" => Some(Currency::INR),
            "USD" => Some(Currency::USD),
            "EUR" => Some(Currency::EUR),
            "GBP" => Some(Currency::GBP),
            "JPY" => Some(Currency::JPY),
            _ => None,
        }
    }

    /// Round an exact amount to this currency's minor unit, half up.
    pub fn round(&self, amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(self.decimal_places(), RoundingStrategy::MidpointAwayFromZero)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A monetary value with currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Money {
    /// Amount in the smallest currency unit.
    pub minor: i64,
    /// The currency.
    pub currency: Currency,
}

impl Money {
    /// Create a new Money value from minor units.
    pub fn new(minor: i64, currency: Currency) -> Self {
        Self { minor, currency }
    }

    /// Create a Money value from whole major units (`from_major(100, INR)` is ₹100.00).
    pub fn from_major(major: i64, currency: Currency) -> Self {
        Self::new(major.saturating_mul(minor_per_major(currency)), currency)
    }

    /// Create a Money value from an exact decimal amount in major units,
    /// rounding half up to the minor unit.
    ///
    /// ```
    /// use rust_decimal::Decimal;
    /// use storefront_commerce::money::{Currency, Money};
    /// let m = Money::from_decimal(Decimal::new(12345, 3), Currency::INR).unwrap();
    /// assert_eq!(m.minor, 1235);
    /// ```
    pub fn from_decimal(amount: Decimal, currency: Currency) -> Result<Self, CommerceError> {
        let minor = currency
            .round(amount)
            .checked_mul(Decimal::from(minor_per_major(currency)))
            .and_then(|scaled| scaled.to_i64())
            .ok_or(CommerceError::Overflow)?;
        Ok(Self::new(minor, currency))
    }

    /// Create a zero amount in the given currency.
    pub fn zero(currency: Currency) -> Self {
        Self::new(0, currency)
    }

    /// Check if this is zero.
    pub fn is_zero(&self) -> bool {
        self.minor == 0
    }

    /// Check if this is negative.
    pub fn is_negative(&self) -> bool {
        self.minor < 0
    }

    /// Convert to an exact decimal value in major units.
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.minor, self.currency.decimal_places())
    }

    /// Format as a display string (e.g., "₹345.00").
    pub fn display(&self) -> String {
        format!("{}{}", self.currency.symbol(), self.to_decimal())
    }

    /// Format as a display string without symbol (e.g., "345.00").
    pub fn display_amount(&self) -> String {
        self.to_decimal().to_string()
    }

    /// Add another Money value.
    pub fn checked_add(&self, other: &Money) -> Result<Money, CommerceError> {
        self.ensure_same_currency(other)?;
        let minor = self
            .minor
            .checked_add(other.minor)
            .ok_or(CommerceError::Overflow)?;
        Ok(Money::new(minor, self.currency))
    }

    /// Subtract another Money value.
    pub fn checked_sub(&self, other: &Money) -> Result<Money, CommerceError> {
        self.ensure_same_currency(other)?;
        let minor = self
            .minor
            .checked_sub(other.minor)
            .ok_or(CommerceError::Overflow)?;
        Ok(Money::new(minor, self.currency))
    }

    /// Multiply by a quantity.
    pub fn checked_mul(&self, quantity: u32) -> Result<Money, CommerceError> {
        let minor = self
            .minor
            .checked_mul(i64::from(quantity))
            .ok_or(CommerceError::Overflow)?;
        Ok(Money::new(minor, self.currency))
    }

    fn ensure_same_currency(&self, other: &Money) -> Result<(), CommerceError> {
        if self.currency != other.currency {
            return Err(CommerceError::CurrencyMismatch {
                expected: self.currency.code().to_string(),
                got: other.currency.code().to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

fn minor_per_major(currency: Currency) -> i64 {
    10_i64.pow(currency.decimal_places())
}
