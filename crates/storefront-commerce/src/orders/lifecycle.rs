//! Order lifecycle: recording orders and moving them through their statuses.

use std::sync::Arc;

use crate::error::CommerceError;
use crate::ids::OrderId;
use crate::orders::{InMemoryOrderStore, Order, OrderStatus, OrderStore};

/// Front door to the order store.
///
/// Cheap to clone; clones share the same store.
#[derive(Clone)]
pub struct OrderBook {
    store: Arc<dyn OrderStore>,
}

impl OrderBook {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    /// An order book backed by process memory.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryOrderStore::new()))
    }

    /// Save a newly created order. Each order is recorded exactly once.
    pub fn record(&self, order: &Order) -> Result<(), CommerceError> {
        if self.store.get(&order.id)?.is_some() {
            return Err(CommerceError::ValidationError(format!(
                "order {} is already recorded",
                order.id
            )));
        }
        self.store.save(order)
    }

    /// All orders in creation order.
    pub fn list(&self) -> Result<Vec<Order>, CommerceError> {
        self.store.list()
    }

    pub fn get(&self, id: &OrderId) -> Result<Order, CommerceError> {
        self.store
            .get(id)?
            .ok_or_else(|| CommerceError::OrderNotFound(id.to_string()))
    }

    /// Orders flagged for manual stock reconciliation.
    pub fn needing_reconciliation(&self) -> Result<Vec<Order>, CommerceError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|o| o.needs_reconciliation)
            .collect())
    }

    /// Apply a status change and optional tracking reference, then persist.
    pub fn update_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
        tracking_reference: Option<String>,
    ) -> Result<Order, CommerceError> {
        let mut order = self.get(id)?;
        let previous = order.status;
        order.update_status(status, tracking_reference)?;
        self.store.save(&order)?;

        tracing::info!(
            order_id = %order.id,
            from = previous.as_str(),
            to = order.status.as_str(),
            tracking = order.tracking_reference.as_deref().unwrap_or(""),
            "order status updated"
        );
        Ok(order)
    }
}

impl std::fmt::Debug for OrderBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderBook").finish_non_exhaustive()
    }
}
