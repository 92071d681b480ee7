//! Buy a cart against the simulated gateway.

use anyhow::{Context as _, Result};
use dialoguer::Confirm;
use storefront_commerce::{CommerceError, Storefront};

use super::{build_session, print_summary, CheckoutArgs};
use crate::context::Context;
use crate::output::status_badge;

/// Run the checkout command.
pub async fn run(args: CheckoutArgs, ctx: &Context) -> Result<()> {
    let (mut shop, store) = ctx.storefront()?;
    let mut session = build_session(&shop, &args.cart, ctx)?;

    // Step 1: Show what will be charged
    let summary = shop.quote(&session)?;
    let amount = summary.total_money()?;
    if !ctx.output.is_json() {
        ctx.output.header("Checkout");
        print_summary(&summary, ctx)?;
    }

    // Step 2: Confirmation
    if !args.yes && !ctx.output.is_json() {
        ctx.output.info("");
        let confirmed = Confirm::new()
            .with_prompt(format!("Pay {} with {}?", amount, args.payment_method))
            .default(true)
            .interact()?;

        if !confirmed {
            ctx.output.warn("Checkout cancelled");
            return Ok(());
        }
    }

    // Step 3: Validate and wait for the gateway
    let pending = shop.begin_checkout(&session)?;
    ctx.output
        .debug(&format!("Checkout attempt {}", pending.token()));

    let spinner = ctx
        .output
        .spinner(&format!("Waiting for payment of {}...", pending.amount()));
    let confirmation = pending.authorize(args.payment_method.as_str()).await;
    spinner.finish_and_clear();

    // Step 4: Record the order against the latest stored stock. The payment
    // may already be captured, so a lock failure must not stop the order.
    let catalog_lock = match ctx.lock_catalog(&store, shop.catalog()) {
        Ok(guard) => Some(guard),
        Err(e) => {
            ctx.output.warn(&format!(
                "Could not lock the catalog, stock will not be updated: {:#}",
                e
            ));
            None
        }
    };
    let save_stock = |shop: &Storefront| -> Result<()> {
        match &catalog_lock {
            Some(_) => ctx.save_catalog(&store, shop.catalog()),
            None => Ok(()),
        }
    };

    match shop.confirm_checkout(&mut session, confirmation) {
        Ok(receipt) => {
            save_stock(&shop)?;

            if ctx.output.is_json() {
                ctx.output.json(&receipt.order);
                return Ok(());
            }

            ctx.output.success("Payment successful! Your order has been placed.");
            ctx.output.kv("Order", receipt.order.id.as_str());
            ctx.output.kv("Total", &receipt.order.total.to_string());
            ctx.output.kv("Delivery", &receipt.order.delivery_method);
            ctx.output.kv("Status", &status_badge(receipt.order.status));
            if let Some(reference) = &receipt.order.payment_reference {
                ctx.output.kv("Payment", reference);
            }

            if catalog_lock.is_none() {
                ctx.output
                    .warn("Stored stock was not updated for this order; reconcile it by hand");
            }
            if receipt.order.needs_reconciliation {
                ctx.output.warn(&format!(
                    "Stock ran out for {} line(s) while paying; order flagged for reconciliation",
                    receipt.order.stock_shortfalls.len()
                ));
            }
            Ok(())
        }
        Err(CommerceError::OrderNotRecorded { order, reason }) => {
            // The charge went through; keep the stock change and show the order.
            save_stock(&shop)?;
            ctx.output.error(&format!(
                "Payment captured but order {} was not saved: {}",
                order.id, reason
            ));
            ctx.output.json(&order);
            Err(CommerceError::OrderNotRecorded { order, reason })
                .context("Checkout needs manual reconciliation")
        }
        Err(e) if e.is_retryable() => {
            Err(e).context("Payment did not go through; cart and stock are unchanged, try again")
        }
        Err(e) => Err(e).context("Checkout failed"),
    }
}
