//! Cart pricing calculations.
//!
//! Pricing is a pure function of the cart, the catalog's prices, the chosen
//! delivery option and a discount rate:
//!
//! ```text
//! subtotal = Σ quantity × unit price
//! discount = subtotal × discount rate
//! tax      = subtotal × tax rate        (on the pre-discount subtotal)
//! total    = subtotal − discount + tax + delivery cost
//! ```
//!
//! All of it is exact decimal arithmetic. Rounding to the currency's minor
//! unit happens once, in [`PriceSummary::rounded`] and
//! [`PriceSummary::total_money`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::Cart;
use crate::catalog::Catalog;
use crate::checkout::DeliveryOption;
use crate::error::CommerceError;
use crate::ids::{DeliveryOptionId, ItemId};
use crate::money::{Currency, Money};

/// Turns a cart into a [`PriceSummary`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingEngine {
    /// Fraction of the subtotal charged as tax (0.18 for 18% GST).
    pub tax_rate: Decimal,
    /// Currency every price must be in.
    pub currency: Currency,
}

impl PricingEngine {
    pub fn new(tax_rate: Decimal, currency: Currency) -> Self {
        Self { tax_rate, currency }
    }

    /// Price the cart's current contents.
    ///
    /// Names and unit prices are captured from the catalog at this moment.
    pub fn price(
        &self,
        cart: &Cart,
        catalog: &Catalog,
        delivery: &DeliveryOption,
        discount_rate: Decimal,
    ) -> Result<PriceSummary, CommerceError> {
        self.ensure_currency(&delivery.cost)?;

        let mut lines = Vec::with_capacity(cart.lines().len());
        let mut subtotal = Decimal::ZERO;

        for line in cart.lines() {
            let item = catalog.get(&line.item_id)?;
            self.ensure_currency(&item.unit_price)?;

            let line_total = item.unit_price.checked_mul(line.quantity)?;
            subtotal = subtotal
                .checked_add(line_total.to_decimal())
                .ok_or(CommerceError::Overflow)?;

            lines.push(LinePricing {
                item_id: item.id,
                name: item.name,
                unit_price: item.unit_price,
                quantity: line.quantity,
                line_total,
            });
        }

        let discount = checked_mul(subtotal, discount_rate)?;
        let tax = checked_mul(subtotal, self.tax_rate)?;
        let delivery_cost = delivery.cost.to_decimal();
        let total = subtotal
            .checked_sub(discount)
            .and_then(|t| t.checked_add(tax))
            .and_then(|t| t.checked_add(delivery_cost))
            .ok_or(CommerceError::Overflow)?;

        Ok(PriceSummary {
            currency: self.currency,
            lines,
            subtotal,
            discount_rate,
            discount,
            tax_rate: self.tax_rate,
            tax,
            delivery_option: delivery.id.clone(),
            delivery: delivery_cost,
            total,
        })
    }

    fn ensure_currency(&self, money: &Money) -> Result<(), CommerceError> {
        if money.currency != self.currency {
            return Err(CommerceError::CurrencyMismatch {
                expected: self.currency.code().to_string(),
                got: money.currency.code().to_string(),
            });
        }
        Ok(())
    }
}

fn checked_mul(a: Decimal, b: Decimal) -> Result<Decimal, CommerceError> {
    a.checked_mul(b).ok_or(CommerceError::Overflow)
}

/// Exact pricing breakdown for a cart. Derived, never stored on its own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceSummary {
    pub currency: Currency,
    /// Per-line pricing, in cart order.
    pub lines: Vec<LinePricing>,
    pub subtotal: Decimal,
    pub discount_rate: Decimal,
    pub discount: Decimal,
    pub tax_rate: Decimal,
    pub tax: Decimal,
    pub delivery_option: DeliveryOptionId,
    /// Delivery cost.
    pub delivery: Decimal,
    /// Final total (subtotal - discount + tax + delivery).
    pub total: Decimal,
}

impl PriceSummary {
    /// Round every component to the currency's minor unit, half up.
    ///
    /// The total is rounded from the exact total, not summed from the
    /// rounded parts.
    pub fn rounded(&self) -> Result<RoundedSummary, CommerceError> {
        let money = |amount: Decimal| Money::from_decimal(amount, self.currency);
        Ok(RoundedSummary {
            subtotal: money(self.subtotal)?,
            discount: money(self.discount)?,
            tax: money(self.tax)?,
            delivery: money(self.delivery)?,
            total: money(self.total)?,
        })
    }

    /// The amount to charge.
    pub fn total_money(&self) -> Result<Money, CommerceError> {
        Money::from_decimal(self.total, self.currency)
    }

    /// Check if a discount was applied.
    pub fn has_discount(&self) -> bool {
        self.discount > Decimal::ZERO
    }

    /// Sum of purchased quantities.
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }
}

/// Pricing breakdown for a single cart line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinePricing {
    pub item_id: ItemId,
    /// Item name when priced.
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
    /// unit_price * quantity.
    pub line_total: Money,
}

/// A [`PriceSummary`] rounded to minor units for display and charging.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundedSummary {
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub delivery: Money,
    pub total: Money,
}
