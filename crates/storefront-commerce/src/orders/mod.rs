//! Order lifecycle module.
//!
//! Contains the order record, its status machine, and order storage.

mod lifecycle;
pub(crate) mod order;
mod store;

pub use lifecycle::OrderBook;
pub use order::{Order, OrderLine, OrderStatus, StockShortfall};
pub use store::{InMemoryOrderStore, KvOrderStore, OrderStore, ORDER_INDEX_KEY};
