//! Price a cart without buying it.

use anyhow::Result;

use super::{build_session, print_summary, QuoteArgs};
use crate::context::Context;

/// Run the quote command.
pub async fn run(args: QuoteArgs, ctx: &Context) -> Result<()> {
    let (shop, _store) = ctx.storefront()?;
    let session = build_session(&shop, &args.cart, ctx)?;
    let summary = shop.quote(&session)?;

    if ctx.output.is_json() {
        ctx.output.json(&summary);
        return Ok(());
    }

    ctx.output.header("Quote");
    print_summary(&summary, ctx)?;

    if let Ok(delivery) = shop.settings().delivery_option(&session.delivery) {
        ctx.output.info("");
        ctx.output.info(&format!("Delivery: {}", delivery.label()));
    }

    Ok(())
}
