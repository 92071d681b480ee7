//! Shopping cart module.
//!
//! Contains the cart, discount codes, and the pricing engine.

mod cart;
mod discount;
mod pricing;

pub use cart::{Cart, CartLine};
pub use discount::{DiscountCode, DiscountCodes, DiscountResolution};
pub use pricing::{LinePricing, PriceSummary, PricingEngine, RoundedSummary};
