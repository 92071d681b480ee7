//! Order types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cart::LinePricing;
use crate::checkout::ValidatedCheckout;
use crate::error::CommerceError;
use crate::ids::{CheckoutToken, DeliveryOptionId, ItemId, OrderId};
use crate::money::{Currency, Money};

/// Order status.
///
/// `Processing → Shipped → Delivered`, or `Processing → Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order paid and being prepared.
    #[default]
    Processing,
    /// Order shipped.
    Shipped,
    /// Order delivered.
    Delivered,
    /// Order cancelled.
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "processing" => Some(OrderStatus::Processing),
            "shipped" => Some(OrderStatus::Shipped),
            "delivered" => Some(OrderStatus::Delivered),
            "cancelled" | "canceled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// Check if order is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Check if order can be cancelled.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Processing)
    }

    /// Check if moving to `next` is allowed. Staying put is always allowed.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        if *self == next {
            return true;
        }
        match next {
            OrderStatus::Cancelled => self.can_cancel(),
            _ => matches!(
                (self, next),
                (OrderStatus::Processing, OrderStatus::Shipped)
                    | (OrderStatus::Shipped, OrderStatus::Delivered)
            ),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Stock that could not be taken for a paid order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockShortfall {
    pub item_id: ItemId,
    pub requested: u32,
    pub available: u32,
}

/// A completed purchase.
///
/// Lines and amounts are a snapshot taken at checkout. After creation only
/// the status, tracking reference and timestamps change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    /// Unique order identifier.
    pub id: OrderId,
    /// Purchased items.
    pub lines: Vec<OrderLine>,
    pub currency: Currency,
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub delivery_cost: Money,
    /// Amount charged.
    pub total: Money,
    /// Delivery method name (e.g., "Standard Delivery").
    pub delivery_method: String,
    pub delivery_option: DeliveryOptionId,
    /// Discount code that was applied, if any.
    pub discount_code: Option<String>,
    /// The checkout attempt that produced this order.
    pub checkout_token: CheckoutToken,
    /// Gateway transaction reference.
    pub payment_reference: Option<String>,
    pub status: OrderStatus,
    /// Carrier tracking reference, stored verbatim.
    pub tracking_reference: Option<String>,
    /// Set when stock could not be decremented after payment.
    #[serde(default)]
    pub needs_reconciliation: bool,
    #[serde(default)]
    pub stock_shortfalls: Vec<StockShortfall>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Materialize a new `Processing` order from a validated checkout.
    pub fn from_checkout(
        validated: &ValidatedCheckout,
        checkout_token: CheckoutToken,
        payment_reference: Option<String>,
    ) -> Self {
        let now = Utc::now();
        let rounded = &validated.rounded;
        Self {
            id: OrderId::generate(),
            lines: validated.summary.lines.iter().map(OrderLine::from).collect(),
            currency: validated.summary.currency,
            subtotal: rounded.subtotal,
            discount: rounded.discount,
            tax: rounded.tax,
            delivery_cost: rounded.delivery,
            total: rounded.total,
            delivery_method: validated.delivery.name.clone(),
            delivery_option: validated.delivery.id.clone(),
            discount_code: validated.discount.applied_code().map(str::to_string),
            checkout_token,
            payment_reference,
            status: OrderStatus::Processing,
            tracking_reference: None,
            needs_reconciliation: false,
            stock_shortfalls: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Get total item count (sum of quantities).
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }

    /// Record stock that could not be taken; the order then needs a human.
    pub fn flag_for_reconciliation(&mut self, shortfalls: Vec<StockShortfall>) {
        if shortfalls.is_empty() {
            return;
        }
        self.needs_reconciliation = true;
        self.stock_shortfalls.extend(shortfalls);
        self.updated_at = Utc::now();
    }

    /// Move to `status`, optionally recording a tracking reference.
    ///
    /// Re-asserting the current status is allowed, so a tracking reference
    /// can be added or corrected without changing status.
    pub fn update_status(
        &mut self,
        status: OrderStatus,
        tracking_reference: Option<String>,
    ) -> Result<(), CommerceError> {
        if !self.status.can_transition_to(status) {
            return Err(CommerceError::InvalidOrderTransition {
                from: self.status.as_str().to_string(),
                to: status.as_str().to_string(),
            });
        }

        self.status = status;
        if tracking_reference.is_some() {
            self.tracking_reference = tracking_reference;
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// A purchased line, as priced at checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderLine {
    pub item_id: ItemId,
    /// Item name (denormalized).
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub line_total: Money,
}

impl From<&LinePricing> for OrderLine {
    fn from(line: &LinePricing) -> Self {
        Self {
            item_id: line.item_id.clone(),
            name: line.name.clone(),
            unit_price: line.unit_price,
            quantity: line.quantity,
            line_total: line.line_total,
        }
    }
}
