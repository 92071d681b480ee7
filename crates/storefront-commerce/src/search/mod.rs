//! Search module.
//!
//! Filtering and sorting over catalog items, as the shop sidebar offers.

mod filter;
mod query;

pub use filter::Filter;
pub use query::{SearchQuery, SortOption};
