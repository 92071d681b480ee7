//! CLI command implementations.

pub mod catalog;
pub mod checkout;
pub mod config;
pub mod orders;
pub mod quote;

use anyhow::{bail, Context as _, Result};
use clap::{Args, Subcommand};
use rust_decimal::Decimal;
use storefront_commerce::cart::PriceSummary;
use storefront_commerce::{DeliveryOptionId, ItemId, ShopSession, Storefront};

use crate::context::Context;

/// Arguments for the catalog command.
#[derive(Args)]
pub struct CatalogArgs {
    #[command(subcommand)]
    pub command: Option<CatalogCommand>,
}

#[derive(Subcommand)]
pub enum CatalogCommand {
    /// List items, optionally filtered and sorted.
    List(ListItemsArgs),
    /// Show an item with its specifications and reviews.
    Show {
        /// Item ID.
        id: String,
    },
    /// Add a review to an item.
    Review {
        /// Item ID.
        id: String,

        /// Stars, 1 to 5.
        #[arg(short, long)]
        rating: u8,

        /// Review text.
        #[arg(short, long, default_value = "")]
        comment: String,

        /// Reviewer name (default: Guest).
        #[arg(short, long, default_value = "")]
        author: String,
    },
    /// List categories.
    Categories,
}

/// Filters for listing catalog items.
#[derive(Args, Default)]
pub struct ListItemsArgs {
    /// Only items in this category.
    #[arg(long)]
    pub category: Option<String>,

    /// Free text matched against name and description.
    #[arg(short = 'q', long)]
    pub search: Option<String>,

    /// Minimum price in whole currency units.
    #[arg(long)]
    pub min_price: Option<i64>,

    /// Maximum price in whole currency units.
    #[arg(long)]
    pub max_price: Option<i64>,

    /// Minimum rating.
    #[arg(long)]
    pub min_rating: Option<f32>,

    /// Only items in stock.
    #[arg(long)]
    pub in_stock: bool,

    /// Sort order: default, price-asc, price-desc, rating-desc, name.
    #[arg(short, long)]
    pub sort: Option<String>,
}

/// Cart contents and choices shared by quote and checkout.
#[derive(Args)]
pub struct CartArgs {
    /// Items as ID or ID=QUANTITY.
    #[arg(required = true)]
    pub items: Vec<String>,

    /// Delivery option ID (default: from settings).
    #[arg(short, long)]
    pub delivery: Option<String>,

    /// Discount code.
    #[arg(long)]
    pub discount: Option<String>,
}

/// Arguments for the quote command.
#[derive(Args)]
pub struct QuoteArgs {
    #[command(flatten)]
    pub cart: CartArgs,
}

/// Arguments for the checkout command.
#[derive(Args)]
pub struct CheckoutArgs {
    #[command(flatten)]
    pub cart: CartArgs,

    /// Payment method token.
    #[arg(short, long, default_value = "tok_visa")]
    pub payment_method: String,

    /// Skip confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the orders command.
#[derive(Args)]
pub struct OrdersArgs {
    #[command(subcommand)]
    pub command: Option<OrdersCommand>,
}

#[derive(Subcommand)]
pub enum OrdersCommand {
    /// List orders, oldest first.
    List {
        /// Only orders flagged for stock reconciliation.
        #[arg(long)]
        reconcile: bool,
    },
    /// Show an order.
    Show {
        /// Order ID.
        id: String,
    },
    /// Update an order's status.
    Status {
        /// Order ID.
        id: String,

        /// New status: processing, shipped, delivered, cancelled.
        status: String,

        /// Carrier tracking reference.
        #[arg(short, long)]
        tracking: Option<String>,
    },
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Initialize a new config file.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Validate the config file.
    Validate,
}

/// Parse `ID` or `ID=QUANTITY`.
pub fn parse_line_item(spec: &str) -> Result<(ItemId, u32)> {
    let (id, quantity) = match spec.split_once('=') {
        Some((id, quantity)) => (
            id.trim(),
            quantity
                .trim()
                .parse()
                .with_context(|| format!("Invalid quantity in '{}'", spec))?,
        ),
        None => (spec.trim(), 1),
    };

    if id.is_empty() {
        bail!("Missing item ID in '{}'", spec);
    }
    Ok((ItemId::new(id), quantity))
}

/// Build a session holding the requested cart.
///
/// A refused discount code is reported and the quote continues without it.
pub fn build_session(shop: &Storefront, args: &CartArgs, ctx: &Context) -> Result<ShopSession> {
    let mut session = shop.open_session()?;

    for spec in &args.items {
        let (id, quantity) = parse_line_item(spec)?;
        shop.add_to_cart(&mut session, &id, quantity)
            .with_context(|| format!("Cannot add {} x {}", quantity, id))?;
    }

    if let Some(delivery) = &args.delivery {
        shop.select_delivery(&mut session, &DeliveryOptionId::new(delivery.as_str()))?;
    }

    if let Some(code) = &args.discount {
        match shop.apply_discount(&mut session, code) {
            Ok(applied) => ctx.output.debug(&format!("Applied {} ({})", applied.code, applied.name)),
            Err(e) => ctx.output.warn(&e.to_string()),
        }
    }

    Ok(session)
}

/// Print a priced cart.
pub fn print_summary(summary: &PriceSummary, ctx: &Context) -> Result<()> {
    let rounded = summary.rounded()?;

    let widths = [28, 12, 5, 12];
    ctx.output.table_row(&["ITEM", "PRICE", "QTY", "TOTAL"], &widths);
    for line in &summary.lines {
        let (price, quantity, total) = (
            line.unit_price.to_string(),
            line.quantity.to_string(),
            line.line_total.to_string(),
        );
        ctx.output
            .table_row(&[line.name.as_str(), &price, &quantity, &total], &widths);
    }

    ctx.output.info("");
    ctx.output.kv("Subtotal", &rounded.subtotal.to_string());
    if summary.has_discount() {
        ctx.output.kv(
            &format!("Discount ({}%)", percent(summary.discount_rate)),
            &format!("-{}", rounded.discount),
        );
    }
    ctx.output.kv(
        &format!("Tax ({}%)", percent(summary.tax_rate)),
        &rounded.tax.to_string(),
    );
    ctx.output.kv(
        &format!("Delivery ({})", summary.delivery_option),
        &rounded.delivery.to_string(),
    );
    ctx.output.kv("Total", &rounded.total.to_string());
    Ok(())
}

/// A rate as a percentage, e.g. 0.18 as 18.
pub fn percent(rate: Decimal) -> Decimal {
    (rate * Decimal::ONE_HUNDRED).normalize()
}
