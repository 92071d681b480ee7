//! Durable key-value store for the storefront engine.
//!
//! Values are serialized as JSON and kept in a single document on disk.
//! Every write takes an exclusive lock on a sidecar file, re-reads the
//! document, applies its own keys and replaces the document atomically
//! (uniquely named temporary file, sync, rename, directory sync). A
//! successful `set` has reached the disk before it returns, and handles in
//! other processes never overwrite it with a stale copy.
//!
//! # Example
//!
//! ```rust,ignore
//! use storefront_store::{store_key, Store};
//!
//! let store = Store::open(".storefront/store.json")?;
//!
//! // Store a value
//! store.set(&store_key!("order", order.id), &order)?;
//!
//! // Retrieve a value
//! let order: Option<Order> = store.get(&store_key!("order", order.id))?;
//! ```

mod error;
mod kv;
mod lock;

pub use error::StoreError;
pub use kv::{Store, Transaction};
pub use lock::FileLock;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{FileLock, Store, StoreError, Transaction};
}
