//! Order listing and status updates.

use anyhow::{bail, Result};
use storefront_commerce::orders::OrderStatus;
use storefront_commerce::OrderId;

use super::{OrdersArgs, OrdersCommand};
use crate::context::Context;
use crate::output::{format_timestamp, status_badge};

/// Run the orders command.
pub async fn run(args: OrdersArgs, ctx: &Context) -> Result<()> {
    match args.command {
        Some(OrdersCommand::List { reconcile }) => list_orders(reconcile, ctx).await,
        None => list_orders(false, ctx).await,
        Some(OrdersCommand::Show { id }) => show_order(&id, ctx).await,
        Some(OrdersCommand::Status {
            id,
            status,
            tracking,
        }) => update_status(&id, &status, tracking, ctx).await,
    }
}

async fn list_orders(reconcile: bool, ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let book = ctx.order_book(&store);
    let orders = if reconcile {
        book.needing_reconciliation()?
    } else {
        book.list()?
    };

    if ctx.output.is_json() {
        ctx.output.json(&orders);
        return Ok(());
    }

    ctx.output.header("Orders");

    if orders.is_empty() {
        ctx.output.info("No orders found.");
        ctx.output.info("Run `storefront checkout` to place one.");
        return Ok(());
    }

    let widths = [22, 20, 6, 12, 12];
    ctx.output
        .table_row(&["ORDER", "PLACED", "ITEMS", "TOTAL", "STATUS"], &widths);
    for order in &orders {
        let placed = format_timestamp(&order.created_at);
        let items = order.item_count().to_string();
        let total = order.total.to_string();
        let status = status_badge(order.status);
        ctx.output.table_row(
            &[order.id.as_str(), &placed, &items, &total, &status],
            &widths,
        );
    }

    let flagged = orders.iter().filter(|o| o.needs_reconciliation).count();
    if flagged > 0 && !reconcile {
        ctx.output.info("");
        ctx.output.warn(&format!(
            "{} order(s) need stock reconciliation (see `storefront orders list --reconcile`)",
            flagged
        ));
    }

    Ok(())
}

async fn show_order(id: &str, ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let order = ctx.order_book(&store).get(&OrderId::new(id))?;

    if ctx.output.is_json() {
        ctx.output.json(&order);
        return Ok(());
    }

    ctx.output.header(&format!("Order {}", order.id));
    ctx.output.kv("Status", &status_badge(order.status));
    ctx.output.kv("Placed", &format_timestamp(&order.created_at));
    ctx.output.kv("Updated", &format_timestamp(&order.updated_at));
    ctx.output.kv("Delivery", &order.delivery_method);
    if let Some(tracking) = &order.tracking_reference {
        ctx.output.kv("Tracking", tracking);
    }

    ctx.output.info("");
    for line in &order.lines {
        ctx.output.list_item(&format!(
            "{} x {} @ {} = {}",
            line.quantity, line.name, line.unit_price, line.line_total
        ));
    }

    ctx.output.info("");
    ctx.output.kv("Subtotal", &order.subtotal.to_string());
    if !order.discount.is_zero() {
        let code = order.discount_code.as_deref().unwrap_or("discount");
        ctx.output
            .kv(&format!("Discount ({})", code), &format!("-{}", order.discount));
    }
    ctx.output.kv("Tax", &order.tax.to_string());
    ctx.output.kv("Delivery", &order.delivery_cost.to_string());
    ctx.output.kv("Total", &order.total.to_string());

    if order.needs_reconciliation {
        ctx.output.info("");
        ctx.output.warn("Stock could not be taken for:");
        for shortfall in &order.stock_shortfalls {
            ctx.output.list_item(&format!(
                "{}: requested {}, available {}",
                shortfall.item_id, shortfall.requested, shortfall.available
            ));
        }
    }

    Ok(())
}

async fn update_status(
    id: &str,
    status: &str,
    tracking: Option<String>,
    ctx: &Context,
) -> Result<()> {
    let Some(status) = OrderStatus::from_str(status) else {
        bail!(
            "Unknown status '{}'. Expected processing, shipped, delivered or cancelled",
            status
        );
    };

    let store = ctx.open_store()?;
    let order = ctx
        .order_book(&store)
        .update_status(&OrderId::new(id), status, tracking)?;

    if ctx.output.is_json() {
        ctx.output.json(&order);
        return Ok(());
    }

    ctx.output.success(&format!(
        "Order {} is now {}",
        order.id,
        status_badge(order.status)
    ));
    if let Some(tracking) = &order.tracking_reference {
        ctx.output.kv("Tracking", tracking);
    }
    Ok(())
}
