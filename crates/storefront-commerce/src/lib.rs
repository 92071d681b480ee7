//! Storefront commerce engine.
//!
//! Keeps a shopper's cart, the shop's stock, discounts, delivery cost, tax
//! and payment state consistent from "add to cart" to a recorded order:
//!
//! - **Catalog**: items, stock, reviews, search
//! - **Cart**: lines validated against stock, discount codes, pricing
//! - **Checkout**: attempt state machine driven against a payment gateway
//! - **Orders**: order records, status lifecycle, durable storage
//!
//! # Example
//!
//! ```rust,ignore
//! use storefront_commerce::prelude::*;
//!
//! let catalog = Arc::new(Catalog::new(vec![
//!     CatalogItem::new("esp32", "ESP32 Dev Board", Money::from_major(450, Currency::INR), "Microcontrollers", 40)?,
//! ])?);
//! let mut shop = Storefront::new(
//!     ShopSettings::default(),
//!     catalog,
//!     SimulatedGateway::new(Duration::from_millis(300)).shared(),
//!     OrderBook::in_memory(),
//! )?;
//!
//! let mut session = shop.open_session()?;
//! shop.add_to_cart(&mut session, &ItemId::new("esp32"), 2)?;
//! println!("Total: {}", shop.quote(&session)?.total_money()?);
//!
//! let receipt = shop.checkout(&mut session, "tok_visa").await?;
//! println!("Order {} placed", receipt.order.id);
//! ```

pub mod error;
pub mod ids;
pub mod money;

pub mod config;
pub mod catalog;
pub mod search;
pub mod cart;
pub mod checkout;
pub mod orders;
pub mod session;
pub mod storefront;

pub use config::ShopSettings;
pub use error::CommerceError;
pub use ids::*;
pub use money::{Currency, Money};
pub use session::ShopSession;
pub use storefront::Storefront;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::ShopSettings;
    pub use crate::error::CommerceError;
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money};
    pub use crate::session::ShopSession;
    pub use crate::storefront::Storefront;

    // Catalog
    pub use crate::catalog::{Catalog, CatalogItem, Review};

    // Cart
    pub use crate::cart::{
        Cart, CartLine, DiscountCode, DiscountCodes, DiscountResolution, PriceSummary,
        PricingEngine,
    };

    // Checkout
    pub use crate::checkout::{
        CheckoutCoordinator, CheckoutReceipt, CheckoutState, DeliveryOption, PaymentGateway,
        PendingPayment, SimulatedGateway,
    };

    // Orders
    pub use crate::orders::{Order, OrderBook, OrderStatus, OrderStore};

    // Search
    pub use crate::search::{Filter, SearchQuery, SortOption};
}
