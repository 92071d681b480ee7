//! Commerce error types.

use std::time::Duration;

use thiserror::Error;

use crate::ids::CheckoutToken;
use crate::orders::Order;

/// Errors that can occur in storefront operations.
#[derive(Error, Debug)]
pub enum CommerceError {
    /// Catalog item not found.
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Delivery option not found.
    #[error("Delivery option not found: {0}")]
    DeliveryOptionNotFound(String),

    /// Item has no stock left.
    #[error("Item out of stock: {item_id}")]
    OutOfStock { item_id: String },

    /// Requested cart quantity exceeds the item's stock.
    #[error("Stock limit exceeded for {item_id}: requested {requested}, available {available}")]
    StockLimitExceeded {
        item_id: String,
        requested: u32,
        available: u32,
    },

    /// Stock decrement larger than the stock on hand.
    #[error("Insufficient stock for {item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        item_id: String,
        requested: u32,
        available: u32,
    },

    /// Item not in cart.
    #[error("Item not in cart: {0}")]
    ItemNotInCart(String),

    /// Invalid quantity.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(u32),

    /// Invalid discount code.
    #[error("Invalid discount code: {code} ({reason})")]
    InvalidDiscountCode { code: String, reason: String },

    /// Checkout attempted with nothing in the cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// The gateway declined the payment.
    #[error("Payment failed: {reason}")]
    PaymentFailed { reason: String },

    /// The gateway did not answer in time.
    #[error("Payment timed out after {0:?}")]
    Timeout(Duration),

    /// Writing to the order store failed.
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    /// Payment was captured but the order could not be saved.
    #[error("Order {} was paid but not recorded: {reason}", .order.id)]
    OrderNotRecorded { order: Box<Order>, reason: String },

    /// A confirmation arrived for an attempt that is no longer current.
    #[error("Stale checkout attempt: {0}")]
    StaleAttempt(CheckoutToken),

    /// Invalid checkout state transition.
    #[error("Invalid checkout transition from {from} to {to}")]
    InvalidCheckoutTransition { from: String, to: String },

    /// Invalid order status transition.
    #[error("Invalid order transition from {from} to {to}")]
    InvalidOrderTransition { from: String, to: String },

    /// Currency mismatch.
    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: String, got: String },

    /// Arithmetic overflow.
    #[error("Arithmetic overflow in money calculation")]
    Overflow,

    /// Serialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Validation error.
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl CommerceError {
    /// Whether the cart and catalog are untouched and the same checkout can be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CommerceError::PaymentFailed { .. }
                | CommerceError::Timeout(_)
                | CommerceError::StaleAttempt(_)
        )
    }
}

impl From<storefront_store::StoreError> for CommerceError {
    fn from(e: storefront_store::StoreError) -> Self {
        CommerceError::PersistenceFailure(e.to_string())
    }
}

impl From<serde_json::Error> for CommerceError {
    fn from(e: serde_json::Error) -> Self {
        CommerceError::SerializationError(e.to_string())
    }
}
