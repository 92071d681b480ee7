//! Checkout attempt state machine.
//!
//! ```text
//! Idle → Validating → AwaitingPayment → Confirming → Succeeded
//!            │                              │
//!            └──────────► Failed ◄──────────┘
//! ```
//!
//! Each attempt carries a fresh [`CheckoutToken`]. `Succeeded` and `Failed`
//! are terminal; trying again means starting a new attempt.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cart::{DiscountResolution, PriceSummary, RoundedSummary};
use crate::checkout::DeliveryOption;
use crate::error::CommerceError;
use crate::ids::CheckoutToken;

/// Why an attempt ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    EmptyCart,
    /// A line asks for more than the catalog holds.
    StockLimitExceeded {
        item_id: String,
        requested: u32,
        available: u32,
    },
    /// The cart could not be priced (unknown item, currency, overflow).
    Invalid { message: String },
    PaymentDeclined { reason: String },
    Timeout,
    /// Payment captured, order not saved.
    OrderNotRecorded { reason: String },
}

impl From<&CommerceError> for FailureReason {
    fn from(err: &CommerceError) -> Self {
        match err {
            CommerceError::EmptyCart => FailureReason::EmptyCart,
            CommerceError::StockLimitExceeded {
                item_id,
                requested,
                available,
            } => FailureReason::StockLimitExceeded {
                item_id: item_id.clone(),
                requested: *requested,
                available: *available,
            },
            CommerceError::PaymentFailed { reason } => FailureReason::PaymentDeclined {
                reason: reason.clone(),
            },
            CommerceError::Timeout(_) => FailureReason::Timeout,
            CommerceError::OrderNotRecorded { reason, .. } => FailureReason::OrderNotRecorded {
                reason: reason.clone(),
            },
            other => FailureReason::Invalid {
                message: other.to_string(),
            },
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::EmptyCart => write!(f, "cart is empty"),
            FailureReason::StockLimitExceeded {
                item_id,
                requested,
                available,
            } => write!(
                f,
                "only {} of {} available, {} requested",
                available, item_id, requested
            ),
            FailureReason::Invalid { message } => write!(f, "{}", message),
            FailureReason::PaymentDeclined { reason } => write!(f, "payment declined: {}", reason),
            FailureReason::Timeout => write!(f, "payment timed out"),
            FailureReason::OrderNotRecorded { reason } => {
                write!(f, "paid but order not recorded: {}", reason)
            }
        }
    }
}

/// State of a checkout attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CheckoutState {
    /// No attempt in progress.
    #[default]
    Idle,
    /// Cart and stock being checked, totals computed.
    Validating,
    /// Charge submitted, waiting on the gateway.
    AwaitingPayment,
    /// Gateway answered, outcome being applied.
    Confirming,
    /// Order recorded.
    Succeeded,
    /// Attempt ended without an order.
    Failed { reason: FailureReason },
}

impl CheckoutState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutState::Idle => "idle",
            CheckoutState::Validating => "validating",
            CheckoutState::AwaitingPayment => "awaiting_payment",
            CheckoutState::Confirming => "confirming",
            CheckoutState::Succeeded => "succeeded",
            CheckoutState::Failed { .. } => "failed",
        }
    }

    /// Check if the attempt is over.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutState::Succeeded | CheckoutState::Failed { .. })
    }

    /// Check if the state machine allows moving to `next`.
    pub fn can_transition_to(&self, next: &CheckoutState) -> bool {
        matches!(
            (self, next),
            (CheckoutState::Idle, CheckoutState::Validating)
                | (CheckoutState::Validating, CheckoutState::AwaitingPayment)
                | (CheckoutState::Validating, CheckoutState::Failed { .. })
                | (CheckoutState::AwaitingPayment, CheckoutState::Confirming)
                | (CheckoutState::Confirming, CheckoutState::Succeeded)
                | (CheckoutState::Confirming, CheckoutState::Failed { .. })
        )
    }
}

impl fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckoutState::Failed { reason } => write!(f, "failed ({})", reason),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// Totals fixed while validating; the charge and the order both come from here.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedCheckout {
    pub summary: PriceSummary,
    pub rounded: RoundedSummary,
    pub delivery: DeliveryOption,
    pub discount: DiscountResolution,
}

/// One run through the state machine.
#[derive(Debug, Clone)]
pub struct CheckoutAttempt {
    pub token: CheckoutToken,
    pub state: CheckoutState,
    pub validated: Option<ValidatedCheckout>,
    pub started_at: DateTime<Utc>,
}

impl CheckoutAttempt {
    /// Start a fresh attempt in `Idle`.
    pub fn new() -> Self {
        Self {
            token: CheckoutToken::generate(),
            state: CheckoutState::Idle,
            validated: None,
            started_at: Utc::now(),
        }
    }

    /// Move to `next` if the state machine allows it.
    pub fn transition(&mut self, next: CheckoutState) -> Result<(), CommerceError> {
        if !self.state.can_transition_to(&next) {
            return Err(CommerceError::InvalidCheckoutTransition {
                from: self.state.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }
        self.state = next;
        Ok(())
    }

    /// Move to `Failed` with the reason derived from `err`, then hand `err` back.
    pub fn fail(&mut self, err: CommerceError) -> CommerceError {
        let failed = CheckoutState::Failed {
            reason: FailureReason::from(&err),
        };
        if let Err(transition) = self.transition(failed) {
            tracing::debug!(token = %self.token, error = %transition, "attempt already settled");
        }
        err
    }
}

impl Default for CheckoutAttempt {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_creation() {
        let attempt = CheckoutAttempt::new();
        assert_eq!(attempt.state, CheckoutState::Idle);
        assert!(attempt.token.as_str().starts_with("chk_"));
        assert_ne!(attempt.token, CheckoutAttempt::new().token);
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut attempt = CheckoutAttempt::new();
        for next in [
            CheckoutState::Validating,
            CheckoutState::AwaitingPayment,
            CheckoutState::Confirming,
            CheckoutState::Succeeded,
        ] {
            attempt.transition(next).unwrap();
        }
        assert!(attempt.state.is_terminal());
    }

    #[test]
    fn test_invalid_transitions() {
        let mut attempt = CheckoutAttempt::new();
        assert!(matches!(
            attempt.transition(CheckoutState::Confirming),
            Err(CommerceError::InvalidCheckoutTransition { .. })
        ));

        attempt.transition(CheckoutState::Validating).unwrap();
        assert!(attempt.transition(CheckoutState::Succeeded).is_err());
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut attempt = CheckoutAttempt::new();
        attempt.transition(CheckoutState::Validating).unwrap();
        let err = attempt.fail(CommerceError::EmptyCart);

        assert!(matches!(err, CommerceError::EmptyCart));
        assert_eq!(
            attempt.state,
            CheckoutState::Failed {
                reason: FailureReason::EmptyCart
            }
        );
        assert!(attempt.transition(CheckoutState::Validating).is_err());
    }

    #[test]
    fn test_failure_reason_display() {
        let state = CheckoutState::Failed {
            reason: FailureReason::PaymentDeclined {
                reason: "card declined".into(),
            },
        };
        assert_eq!(state.to_string(), "failed (payment declined: card declined)");
    }
}
