//! Product catalog module.
//!
//! Contains catalog items, reviews, and the shared catalog with its stock.

mod item;
mod store;

pub use item::{CatalogItem, Review, LOW_STOCK_THRESHOLD, MAX_RATING};
pub use store::Catalog;
