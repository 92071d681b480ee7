//! Shop settings.

use std::collections::HashSet;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::{DiscountCode, DiscountCodes, PricingEngine};
use crate::checkout::DeliveryOption;
use crate::error::CommerceError;
use crate::ids::DeliveryOptionId;
use crate::money::{Currency, Money};

/// Tax, delivery, discount and payment settings for one shop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopSettings {
    /// Currency every price is held in.
    #[serde(default)]
    pub currency: Currency,

    /// Tax rate applied to the pre-discount subtotal (0.18 is 18%).
    #[serde(default = "default_tax_rate")]
    pub tax_rate: Decimal,

    /// Delivery options offered at checkout.
    #[serde(default = "default_delivery_options")]
    pub delivery_options: Vec<DeliveryOption>,

    /// Option selected for a new session.
    #[serde(default = "default_delivery")]
    pub default_delivery: DeliveryOptionId,

    #[serde(default = "default_discount_codes")]
    pub discount_codes: DiscountCodes,

    /// Upper bound on a gateway round trip, in seconds.
    #[serde(default = "default_payment_timeout_secs")]
    pub payment_timeout_secs: u64,
}

fn default_tax_rate() -> Decimal {
    Decimal::new(18, 2)
}

fn default_delivery_options() -> Vec<DeliveryOption> {
    vec![
        DeliveryOption::new(
            "standard",
            "Standard Delivery",
            Money::from_major(50, Currency::INR),
            "5-7 days",
        ),
        DeliveryOption::new(
            "express",
            "Express Delivery",
            Money::from_major(150, Currency::INR),
            "1-2 days",
        ),
    ]
}

fn default_delivery() -> DeliveryOptionId {
    DeliveryOptionId::new("standard")
}

fn default_discount_codes() -> DiscountCodes {
    DiscountCodes::new(vec![DiscountCode::percentage("SAVE10", "10% off", 10)])
}

fn default_payment_timeout_secs() -> u64 {
    30
}

impl Default for ShopSettings {
    fn default() -> Self {
        Self {
            currency: Currency::default(),
            tax_rate: default_tax_rate(),
            delivery_options: default_delivery_options(),
            default_delivery: default_delivery(),
            discount_codes: default_discount_codes(),
            payment_timeout_secs: default_payment_timeout_secs(),
        }
    }
}

impl ShopSettings {
    /// Check the settings are internally consistent.
    pub fn validate(&self) -> Result<(), CommerceError> {
        if self.tax_rate < Decimal::ZERO || self.tax_rate >= Decimal::ONE {
            return Err(CommerceError::ValidationError(format!(
                "tax rate {} must be in [0, 1)",
                self.tax_rate
            )));
        }

        if self.payment_timeout_secs == 0 {
            return Err(CommerceError::ValidationError(
                "payment timeout must be at least one second".into(),
            ));
        }

        if self.delivery_options.is_empty() {
            return Err(CommerceError::ValidationError(
                "at least one delivery option is required".into(),
            ));
        }

        let mut seen = HashSet::new();
        for option in &self.delivery_options {
            if !seen.insert(&option.id) {
                return Err(CommerceError::ValidationError(format!(
                    "duplicate delivery option: {}",
                    option.id
                )));
            }
            if option.cost.is_negative() {
                return Err(CommerceError::ValidationError(format!(
                    "delivery option {} has a negative cost",
                    option.id
                )));
            }
            if option.cost.currency != self.currency {
                return Err(CommerceError::CurrencyMismatch {
                    expected: self.currency.code().to_string(),
                    got: option.cost.currency.code().to_string(),
                });
            }
        }

        self.default_delivery_option()?;
        self.discount_codes.validate()
    }

    /// Look up a delivery option by id.
    pub fn delivery_option(&self, id: &DeliveryOptionId) -> Result<&DeliveryOption, CommerceError> {
        self.delivery_options
            .iter()
            .find(|o| &o.id == id)
            .ok_or_else(|| CommerceError::DeliveryOptionNotFound(id.to_string()))
    }

    pub fn default_delivery_option(&self) -> Result<&DeliveryOption, CommerceError> {
        self.delivery_option(&self.default_delivery)
    }

    pub fn payment_timeout(&self) -> Duration {
        Duration::from_secs(self.payment_timeout_secs)
    }

    pub fn pricing_engine(&self) -> PricingEngine {
        PricingEngine::new(self.tax_rate, self.currency)
    }
}
