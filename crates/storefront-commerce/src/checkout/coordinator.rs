//! Checkout coordinator.
//!
//! Drives checkout attempts through the state machine in
//! [`attempt`](super::attempt), one current attempt per session:
//!
//! 1. [`CheckoutCoordinator::begin`] validates the cart, prices it and fixes
//!    the amount to charge (`Idle → Validating → AwaitingPayment`).
//! 2. [`PendingPayment::authorize`] talks to the gateway. It owns everything
//!    it needs, so the session's cart stays usable while the payment is out.
//! 3. [`CheckoutCoordinator::confirm`] applies the gateway's answer
//!    (`AwaitingPayment → Confirming → Succeeded | Failed`).
//!
//! A new attempt supersedes the same session's previous one and leaves other
//! sessions alone. Confirmations carrying a token that is not the session's
//! current attempt are rejected as [`CommerceError::StaleAttempt`] without
//! side effects.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cart::{Cart, DiscountCodes, DiscountResolution, PriceSummary, PricingEngine};
use crate::catalog::Catalog;
use crate::checkout::{
    CheckoutAttempt, CheckoutState, DeliveryOption, PaymentGateway, PaymentRequest,
    ValidatedCheckout,
};
use crate::error::CommerceError;
use crate::ids::{CheckoutToken, SessionId};
use crate::money::Money;
use crate::orders::{Order, OrderBook, StockShortfall};

/// Default bound on a gateway round trip.
pub const DEFAULT_PAYMENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs checkout attempts against a payment gateway and records orders.
pub struct CheckoutCoordinator {
    gateway: Arc<dyn PaymentGateway>,
    orders: OrderBook,
    pricing: PricingEngine,
    discounts: DiscountCodes,
    timeout: Duration,
    attempts: HashMap<SessionId, CheckoutAttempt>,
}

impl CheckoutCoordinator {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        orders: OrderBook,
        pricing: PricingEngine,
        discounts: DiscountCodes,
    ) -> Self {
        Self {
            gateway,
            orders,
            pricing,
            discounts,
            timeout: DEFAULT_PAYMENT_TIMEOUT,
            attempts: HashMap::new(),
        }
    }

    /// Bound every gateway call by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn orders(&self) -> &OrderBook {
        &self.orders
    }

    /// State of the session's current attempt, `Idle` when there is none.
    pub fn state(&self, session: &SessionId) -> CheckoutState {
        self.attempts
            .get(session)
            .map_or(CheckoutState::Idle, |a| a.state.clone())
    }

    /// Token of the session's current attempt.
    pub fn current_token(&self, session: &SessionId) -> Option<&CheckoutToken> {
        self.attempts.get(session).map(|a| &a.token)
    }

    /// Drop whatever the coordinator remembers about a session.
    pub fn forget(&mut self, session: &SessionId) -> Option<CheckoutAttempt> {
        self.attempts.remove(session)
    }

    /// Start a fresh attempt for `session`: validate the cart, price it, and
    /// prepare the charge.
    ///
    /// The session's attempt still in flight, if any, is superseded. On error
    /// the new attempt is left in `Failed` and nothing else changes.
    pub fn begin(
        &mut self,
        session: &SessionId,
        cart: &Cart,
        catalog: &Catalog,
        delivery: &DeliveryOption,
        discount_code: Option<&str>,
    ) -> Result<PendingPayment, CommerceError> {
        if let Some(previous) = self.attempts.get(session) {
            if !previous.state.is_terminal() {
                tracing::debug!(
                    session = %session,
                    token = %previous.token,
                    state = previous.state.as_str(),
                    "superseding unfinished checkout attempt"
                );
            }
        }

        let mut attempt = CheckoutAttempt::new();
        attempt.transition(CheckoutState::Validating)?;

        let validated = match self.validate(cart, catalog, delivery, discount_code) {
            Ok(validated) => validated,
            Err(e) => {
                let e = attempt.fail(e);
                self.attempts.insert(session.clone(), attempt);
                return Err(e);
            }
        };

        attempt.transition(CheckoutState::AwaitingPayment)?;

        let pending = PendingPayment {
            token: attempt.token.clone(),
            amount: validated.rounded.total,
            summary: validated.summary.clone(),
            discount: validated.discount.clone(),
            gateway: Arc::clone(&self.gateway),
            timeout: self.timeout,
        };

        tracing::debug!(
            session = %session,
            token = %attempt.token,
            amount = pending.amount.minor,
            lines = validated.summary.lines.len(),
            "checkout awaiting payment"
        );

        attempt.validated = Some(validated);
        self.attempts.insert(session.clone(), attempt);
        Ok(pending)
    }

    fn validate(
        &self,
        cart: &Cart,
        catalog: &Catalog,
        delivery: &DeliveryOption,
        discount_code: Option<&str>,
    ) -> Result<ValidatedCheckout, CommerceError> {
        if cart.is_empty() {
            return Err(CommerceError::EmptyCart);
        }
        cart.revalidate(catalog)?;

        let discount = self.discounts.resolve_optional(discount_code);
        if let DiscountResolution::Rejected { code, reason } = &discount {
            tracing::debug!(code = %code, reason = %reason, "discount code rejected at checkout");
        }

        let summary = self
            .pricing
            .price(cart, catalog, delivery, discount.rate())?;
        let rounded = summary.rounded()?;

        Ok(ValidatedCheckout {
            summary,
            rounded,
            delivery: delivery.clone(),
            discount,
        })
    }

    /// Apply the gateway's answer to the session's current attempt.
    ///
    /// On success the order is built from the totals fixed in `begin`, stock
    /// is taken for every line, the order is saved, and the purchased
    /// quantities leave the cart. Stock that has vanished in the meantime
    /// does not undo a captured payment; the order is flagged for
    /// reconciliation instead.
    ///
    /// A confirmation whose token is not `session`'s current attempt (older,
    /// already applied, or another session's) is rejected untouched.
    pub fn confirm(
        &mut self,
        session: &SessionId,
        cart: &mut Cart,
        catalog: &Catalog,
        confirmation: PaymentConfirmation,
    ) -> Result<CheckoutReceipt, CommerceError> {
        let is_current = self.attempts.get(session).is_some_and(|a| {
            a.token == confirmation.token && a.state == CheckoutState::AwaitingPayment
        });
        let Some(attempt) = self.attempts.get_mut(session).filter(|_| is_current) else {
            if matches!(confirmation.outcome, PaymentOutcome::Succeeded { .. }) {
                tracing::warn!(
                    session = %session,
                    token = %confirmation.token,
                    "discarding captured payment for a stale checkout attempt"
                );
            } else {
                tracing::debug!(
                    session = %session,
                    token = %confirmation.token,
                    "discarding stale payment confirmation"
                );
            }
            return Err(CommerceError::StaleAttempt(confirmation.token));
        };

        attempt.transition(CheckoutState::Confirming)?;

        let payment_reference = match confirmation.outcome {
            PaymentOutcome::Succeeded { transaction_id } => transaction_id,
            PaymentOutcome::Declined { reason } => {
                tracing::warn!(token = %attempt.token, reason = %reason, "payment declined");
                return Err(attempt.fail(CommerceError::PaymentFailed { reason }));
            }
            PaymentOutcome::TimedOut { after } => {
                tracing::warn!(token = %attempt.token, timeout = ?after, "payment timed out");
                return Err(attempt.fail(CommerceError::Timeout(after)));
            }
        };

        let Some(validated) = attempt.validated.clone() else {
            return Err(attempt.fail(CommerceError::ValidationError(
                "attempt reached confirmation without validated totals".into(),
            )));
        };

        let mut order = Order::from_checkout(&validated, attempt.token.clone(), payment_reference);
        order.flag_for_reconciliation(take_stock(catalog, &order));

        if let Err(e) = self.orders.record(&order) {
            tracing::error!(
                order_id = %order.id,
                token = %attempt.token,
                total = order.total.minor,
                error = %e,
                "payment captured but order not recorded"
            );
            remove_purchased(cart, &order);
            return Err(attempt.fail(CommerceError::OrderNotRecorded {
                order: Box::new(order),
                reason: e.to_string(),
            }));
        }

        remove_purchased(cart, &order);
        attempt.transition(CheckoutState::Succeeded)?;

        tracing::info!(
            session = %session,
            order_id = %order.id,
            token = %attempt.token,
            total = order.total.minor,
            items = order.item_count(),
            needs_reconciliation = order.needs_reconciliation,
            "checkout succeeded"
        );

        Ok(CheckoutReceipt {
            order,
            summary: validated.summary,
            discount: validated.discount,
        })
    }

    /// Run a whole attempt: begin, authorize, confirm.
    pub async fn checkout(
        &mut self,
        session: &SessionId,
        cart: &mut Cart,
        catalog: &Catalog,
        delivery: &DeliveryOption,
        discount_code: Option<&str>,
        payment_method: &str,
    ) -> Result<CheckoutReceipt, CommerceError> {
        let pending = self.begin(session, cart, catalog, delivery, discount_code)?;
        let confirmation = pending.authorize(payment_method).await;
        self.confirm(session, cart, catalog, confirmation)
    }
}

impl std::fmt::Debug for CheckoutCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutCoordinator")
            .field("timeout", &self.timeout)
            .field("attempts", &self.attempts)
            .finish_non_exhaustive()
    }
}

/// Take the order's quantities out of the cart. Lines added while the
/// payment was out stay.
fn remove_purchased(cart: &mut Cart, order: &Order) {
    for line in &order.lines {
        cart.deduct(&line.item_id, line.quantity);
    }
}

/// Decrement stock for every order line, collecting what could not be taken.
fn take_stock(catalog: &Catalog, order: &Order) -> Vec<StockShortfall> {
    let mut shortfalls = Vec::new();
    for line in &order.lines {
        if let Err(e) = catalog.decrement_stock(&line.item_id, line.quantity) {
            let available = match &e {
                CommerceError::InsufficientStock { available, .. } => *available,
                _ => 0,
            };
            tracing::warn!(
                order_id = %order.id,
                item_id = %line.item_id,
                requested = line.quantity,
                available,
                error = %e,
                "stock shortfall on paid order"
            );
            shortfalls.push(StockShortfall {
                item_id: line.item_id.clone(),
                requested: line.quantity,
                available,
            });
        }
    }
    shortfalls
}

/// A validated attempt whose charge has not been submitted yet.
///
/// Holds its own handle to the gateway and borrows nothing, so the cart can
/// keep changing while the payment is out.
pub struct PendingPayment {
    token: CheckoutToken,
    amount: Money,
    summary: PriceSummary,
    discount: DiscountResolution,
    gateway: Arc<dyn PaymentGateway>,
    timeout: Duration,
}

impl PendingPayment {
    pub fn token(&self) -> &CheckoutToken {
        &self.token
    }

    /// The amount that will be charged.
    pub fn amount(&self) -> Money {
        self.amount
    }

    /// Totals fixed while validating.
    pub fn summary(&self) -> &PriceSummary {
        &self.summary
    }

    pub fn discount(&self) -> &DiscountResolution {
        &self.discount
    }

    /// Submit the charge and wait for the gateway, at most the configured timeout.
    pub async fn authorize(self, payment_method: impl Into<String>) -> PaymentConfirmation {
        let request = PaymentRequest {
            attempt: self.token.clone(),
            amount: self.amount,
            payment_method: payment_method.into(),
        };

        let outcome = match tokio::time::timeout(self.timeout, self.gateway.authorize(&request)).await
        {
            Ok(response) if response.is_success() => PaymentOutcome::Succeeded {
                transaction_id: response.transaction_id,
            },
            Ok(response) => PaymentOutcome::Declined {
                reason: response
                    .reason
                    .unwrap_or_else(|| "payment declined".to_string()),
            },
            Err(_) => PaymentOutcome::TimedOut {
                after: self.timeout,
            },
        };

        PaymentConfirmation {
            token: self.token,
            outcome,
        }
    }
}

impl std::fmt::Debug for PendingPayment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingPayment")
            .field("token", &self.token)
            .field("amount", &self.amount)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// What the gateway said about an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PaymentOutcome {
    Succeeded { transaction_id: Option<String> },
    Declined { reason: String },
    TimedOut { after: Duration },
}

/// A gateway answer addressed to one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub token: CheckoutToken,
    pub outcome: PaymentOutcome,
}

/// The result of a successful checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutReceipt {
    /// The recorded order.
    pub order: Order,
    /// Exact totals the order was built from.
    pub summary: PriceSummary,
    pub discount: DiscountResolution,
}
