//! Payment gateway boundary.
//!
//! The engine only needs "submit amount, receive success or failure".
//! Tokenization and card capture live behind [`PaymentGateway`].

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ids::CheckoutToken;
use crate::money::Money;

/// Payment method tokens with this prefix are always declined by [`SimulatedGateway`].
pub const DECLINE_PREFIX: &str = "tok_decline";

/// A charge request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentRequest {
    /// Attempt the charge belongs to; gateways may use it as an idempotency key.
    pub attempt: CheckoutToken,
    /// Amount to charge, in minor units.
    pub amount: Money,
    /// Opaque payment method token from the client.
    pub payment_method: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Succeeded,
    Failed,
}

/// The gateway's answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentResponse {
    pub status: PaymentStatus,
    /// Why the payment failed, when it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Gateway-side reference for a captured payment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

impl PaymentResponse {
    pub fn succeeded(transaction_id: impl Into<String>) -> Self {
        Self {
            status: PaymentStatus::Succeeded,
            reason: None,
            transaction_id: Some(transaction_id.into()),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: PaymentStatus::Failed,
            reason: Some(reason.into()),
            transaction_id: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == PaymentStatus::Succeeded
    }
}

/// An external payment processor.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Authorize and capture `request.amount`.
    async fn authorize(&self, request: &PaymentRequest) -> PaymentResponse;
}

/// Gateway that answers after a fixed delay.
///
/// Declines configured method tokens and any token starting with
/// [`DECLINE_PREFIX`]; everything else succeeds.
#[derive(Debug, Default)]
pub struct SimulatedGateway {
    latency: Duration,
    declined_methods: HashSet<String>,
    authorizations: AtomicUsize,
}

impl SimulatedGateway {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Always decline `method`.
    pub fn decline(mut self, method: impl Into<String>) -> Self {
        self.declined_methods.insert(method.into());
        self
    }

    /// Wrap in an `Arc` for sharing with a coordinator.
    pub fn shared(self) -> Arc<dyn PaymentGateway> {
        Arc::new(self)
    }

    /// Number of authorization requests received.
    pub fn authorizations(&self) -> usize {
        self.authorizations.load(Ordering::SeqCst)
    }

    fn declines(&self, method: &str) -> bool {
        method.starts_with(DECLINE_PREFIX) || self.declined_methods.contains(method)
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn authorize(&self, request: &PaymentRequest) -> PaymentResponse {
        self.authorizations.fetch_add(1, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if self.declines(&request.payment_method) {
            tracing::debug!(
                attempt = %request.attempt,
                amount = request.amount.minor,
                "simulated payment declined"
            );
            return PaymentResponse::failed("card declined");
        }

        let transaction_id = format!("sim_txn_{}", request.attempt);
        tracing::debug!(
            attempt = %request.attempt,
            amount = request.amount.minor,
            transaction_id = %transaction_id,
            "simulated payment captured"
        );
        PaymentResponse::succeeded(transaction_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    fn request(method: &str) -> PaymentRequest {
        PaymentRequest {
            attempt: CheckoutToken::new("chk_test"),
            amount: Money::from_major(345, Currency::INR),
            payment_method: method.to_string(),
        }
    }

    #[tokio::test]
    async fn test_simulated_gateway_succeeds() {
        let gateway = SimulatedGateway::new(Duration::ZERO);
        let response = gateway.authorize(&request("tok_visa")).await;

        assert!(response.is_success());
        assert_eq!(response.transaction_id.as_deref(), Some("sim_txn_chk_test"));
        assert_eq!(gateway.authorizations(), 1);
    }

    #[tokio::test]
    async fn test_simulated_gateway_declines() {
        let gateway = SimulatedGateway::new(Duration::ZERO).decline("tok_stolen");

        let response = gateway.authorize(&request("tok_decline_insufficient")).await;
        assert_eq!(response.status, PaymentStatus::Failed);
        assert!(response.reason.is_some());

        assert!(!gateway.authorize(&request("tok_stolen")).await.is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_gateway_latency() {
        let gateway = SimulatedGateway::new(Duration::from_secs(2));
        let started = tokio::time::Instant::now();
        gateway.authorize(&request("tok_visa")).await;
        assert!(started.elapsed() >= Duration::from_secs(2));
    }
}
