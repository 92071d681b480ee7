//! Order persistence.

use std::sync::{Arc, Mutex, PoisonError};

use storefront_store::{store_key, Store};

use crate::error::CommerceError;
use crate::ids::OrderId;
use crate::orders::Order;

/// Key of the creation-ordered list of order ids.
pub const ORDER_INDEX_KEY: &str = "orders:index";

/// Durable storage for orders, keyed by order id.
///
/// `save` inserts or replaces. It must not return `Ok` before the order is
/// durable.
pub trait OrderStore: Send + Sync {
    fn save(&self, order: &Order) -> Result<(), CommerceError>;

    fn get(&self, id: &OrderId) -> Result<Option<Order>, CommerceError>;

    /// All orders in creation order.
    fn list(&self) -> Result<Vec<Order>, CommerceError>;
}

/// Orders kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: Mutex<Vec<Order>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrderStore for InMemoryOrderStore {
    fn save(&self, order: &Order) -> Result<(), CommerceError> {
        let mut orders = self.orders.lock().unwrap_or_else(PoisonError::into_inner);
        match orders.iter_mut().find(|o| o.id == order.id) {
            Some(existing) => *existing = order.clone(),
            None => orders.push(order.clone()),
        }
        Ok(())
    }

    fn get(&self, id: &OrderId) -> Result<Option<Order>, CommerceError> {
        let orders = self.orders.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(orders.iter().find(|o| &o.id == id).cloned())
    }

    fn list(&self) -> Result<Vec<Order>, CommerceError> {
        Ok(self
            .orders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}

/// Orders kept in a [`Store`], one key per order plus an id index.
///
/// The order and the index are written together in one store transaction,
/// so saves through any handle on the same file never drop each other's
/// index entries.
#[derive(Debug, Clone)]
pub struct KvOrderStore {
    store: Arc<Store>,
}

impl KvOrderStore {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    fn index(&self) -> Result<Vec<OrderId>, CommerceError> {
        Ok(self.store.get(ORDER_INDEX_KEY)?.unwrap_or_default())
    }
}

impl OrderStore for KvOrderStore {
    fn save(&self, order: &Order) -> Result<(), CommerceError> {
        self.store.transaction(|tx| {
            let mut index: Vec<OrderId> = tx.get(ORDER_INDEX_KEY)?.unwrap_or_default();
            if !index.contains(&order.id) {
                index.push(order.id.clone());
            }
            tx.set(&store_key!("order", order.id), order)?;
            tx.set(ORDER_INDEX_KEY, &index)?;
            Ok(())
        })
    }

    fn get(&self, id: &OrderId) -> Result<Option<Order>, CommerceError> {
        Ok(self.store.get(&store_key!("order", id))?)
    }

    fn list(&self) -> Result<Vec<Order>, CommerceError> {
        let mut orders = Vec::new();
        for id in self.index()? {
            match self.get(&id)? {
                Some(order) => orders.push(order),
                None => tracing::warn!(order_id = %id, "indexed order missing from store"),
            }
        }
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::order::fixtures::order;
    use crate::orders::OrderStatus;

    fn exercise(store: &dyn OrderStore) {
        store.save(&order("ord_b")).unwrap();
        store.save(&order("ord_a")).unwrap();

        let mut shipped = order("ord_b");
        shipped.status = OrderStatus::Shipped;
        store.save(&shipped).unwrap();

        let ids: Vec<_> = store
            .list()
            .unwrap()
            .into_iter()
            .map(|o| o.id.into_inner())
            .collect();
        assert_eq!(ids, vec!["ord_b", "ord_a"]);

        let loaded = store.get(&OrderId::new("ord_b")).unwrap().unwrap();
        assert_eq!(loaded.status, OrderStatus::Shipped);
        assert!(store.get(&OrderId::new("ord_zzz")).unwrap().is_none());
    }

    #[test]
    fn test_in_memory_store() {
        exercise(&InMemoryOrderStore::new());
    }

    #[test]
    fn test_kv_store() {
        exercise(&KvOrderStore::new(Arc::new(Store::in_memory())));
    }

    #[test]
    fn test_two_handles_on_one_file_keep_both_orders() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let first = KvOrderStore::new(Arc::new(Store::open(&path).unwrap()));
        let second = KvOrderStore::new(Arc::new(Store::open(&path).unwrap()));
        first.save(&order("ord_1")).unwrap();
        second.save(&order("ord_2")).unwrap();

        let reopened = KvOrderStore::new(Arc::new(Store::open(&path).unwrap()));
        let ids: Vec<_> = reopened
            .list()
            .unwrap()
            .into_iter()
            .map(|o| o.id.into_inner())
            .collect();
        assert_eq!(ids, vec!["ord_1", "ord_2"]);
        assert!(first.get(&OrderId::new("ord_2")).unwrap().is_some());
    }

    #[test]
    fn test_concurrent_saves_keep_every_index_entry() {
        let store = KvOrderStore::new(Arc::new(Store::in_memory()));

        std::thread::scope(|scope| {
            for t in 0..4 {
                let store = &store;
                scope.spawn(move || {
                    for i in 0..10 {
                        store.save(&order(&format!("ord_{t}_{i}"))).unwrap();
                    }
                });
            }
        });

        assert_eq!(store.list().unwrap().len(), 40);
    }

    #[test]
    fn test_kv_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        {
            let store = KvOrderStore::new(Arc::new(Store::open(&path).unwrap()));
            store.save(&order("ord_1")).unwrap();
        }

        let reopened = KvOrderStore::new(Arc::new(Store::open(&path).unwrap()));
        let orders = reopened.list().unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].id.as_str(), "ord_1");
        assert_eq!(orders[0].total, order("ord_1").total);
    }
}
