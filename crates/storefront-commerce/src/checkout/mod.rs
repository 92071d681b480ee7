//! Checkout module.
//!
//! Delivery options, the payment gateway boundary, the attempt state
//! machine, and the coordinator that drives an attempt to an order.

mod attempt;
mod coordinator;
mod delivery;
mod gateway;

pub use attempt::{CheckoutAttempt, CheckoutState, FailureReason, ValidatedCheckout};
pub use coordinator::{
    CheckoutCoordinator, CheckoutReceipt, PaymentConfirmation, PaymentOutcome, PendingPayment,
    DEFAULT_PAYMENT_TIMEOUT,
};
pub use delivery::DeliveryOption;
pub use gateway::{
    PaymentGateway, PaymentRequest, PaymentResponse, PaymentStatus, SimulatedGateway,
    DECLINE_PREFIX,
};
