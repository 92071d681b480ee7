//! Delivery option types.

use crate::ids::DeliveryOptionId;
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// A delivery option offered at checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveryOption {
    /// Unique identifier (e.g., "standard").
    pub id: DeliveryOptionId,
    /// Display name.
    pub name: String,
    /// Flat delivery cost.
    pub cost: Money,
    /// Informational lead time (e.g., "5-7 days").
    pub estimated_days: String,
}

impl DeliveryOption {
    /// Create a new delivery option.
    pub fn new(
        id: impl Into<DeliveryOptionId>,
        name: impl Into<String>,
        cost: Money,
        estimated_days: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            cost,
            estimated_days: estimated_days.into(),
        }
    }

    /// Check if delivery is free.
    pub fn is_free(&self) -> bool {
        self.cost.is_zero()
    }

    /// Label for listings, e.g. "Express Delivery (₹150.00, 1-2 days)".
    pub fn label(&self) -> String {
        format!("{} ({}, {})", self.name, self.cost, self.estimated_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    #[test]
    fn test_delivery_label() {
        let express = DeliveryOption::new(
            "express",
            "Express Delivery",
            Money::from_major(150, Currency::INR),
            "1-2 days",
        );
        assert_eq!(express.label(), "Express Delivery (\u{20b9}150.00, 1-2 days)");
        assert!(!express.is_free());
    }
}
