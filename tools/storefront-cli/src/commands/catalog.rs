//! Catalog browsing and reviews.

use anyhow::{bail, Context as _, Result};
use storefront_commerce::catalog::Review;
use storefront_commerce::search::{Filter, SearchQuery, SortOption};
use storefront_commerce::{ItemId, Money};

use super::{CatalogArgs, CatalogCommand, ListItemsArgs};
use crate::context::Context;
use crate::output::{format_rating, format_timestamp, stock_badge};

/// Run the catalog command.
pub async fn run(args: CatalogArgs, ctx: &Context) -> Result<()> {
    match args.command {
        Some(CatalogCommand::List(list)) => list_items(&list, ctx).await,
        None => list_items(&ListItemsArgs::default(), ctx).await,
        Some(CatalogCommand::Show { id }) => show_item(&id, ctx).await,
        Some(CatalogCommand::Review {
            id,
            rating,
            comment,
            author,
        }) => add_review(&id, &author, rating, &comment, ctx).await,
        Some(CatalogCommand::Categories) => list_categories(ctx).await,
    }
}

fn build_query(args: &ListItemsArgs, ctx: &Context) -> Result<SearchQuery> {
    let currency = ctx.config.settings.currency;
    let mut query = SearchQuery::new();

    if let Some(category) = &args.category {
        query = query.with_category(category.as_str());
    }
    if let Some(text) = &args.search {
        query = query.with_text(text.as_str());
    }
    if args.min_price.is_some() || args.max_price.is_some() {
        query = query.with_filter(Filter::price_range(
            args.min_price.map(|p| Money::from_major(p, currency)),
            args.max_price.map(|p| Money::from_major(p, currency)),
        ));
    }
    if let Some(rating) = args.min_rating {
        query = query.with_filter(Filter::min_rating(rating));
    }
    if args.in_stock {
        query = query.with_filter(Filter::in_stock());
    }
    if let Some(sort) = &args.sort {
        let Some(sort) = SortOption::from_str(sort) else {
            bail!(
                "Unknown sort '{}'. Expected default, price-asc, price-desc, rating-desc or name",
                sort
            );
        };
        query = query.with_sort(sort);
    }

    Ok(query)
}

async fn list_items(args: &ListItemsArgs, ctx: &Context) -> Result<()> {
    let (shop, _store) = ctx.storefront()?;
    let query = build_query(args, ctx)?;
    let items = shop.search(&query);

    if ctx.output.is_json() {
        ctx.output.json(&items);
        return Ok(());
    }

    ctx.output.header("Catalog");

    if items.is_empty() {
        ctx.output.info("No items match.");
        return Ok(());
    }

    let widths = [18, 36, 12, 16, 6, 6];
    ctx.output.table_row(
        &["ID", "NAME", "PRICE", "CATEGORY", "STOCK", "RATING"],
        &widths,
    );
    for item in &items {
        let price = item.unit_price.to_string();
        let stock = item.stock.to_string();
        let rating = format!("{:.1}", item.rating);
        ctx.output.table_row(
            &[item.id.as_str(), &item.name, &price, &item.category, &stock, &rating],
            &widths,
        );
    }

    ctx.output.info("");
    ctx.output.info(&format!("{} item(s)", items.len()));

    Ok(())
}

async fn show_item(id: &str, ctx: &Context) -> Result<()> {
    let (shop, _store) = ctx.storefront()?;
    let item = shop.catalog().get(&ItemId::new(id))?;

    if ctx.output.is_json() {
        ctx.output.json(&item);
        return Ok(());
    }

    ctx.output.header(&item.name);
    ctx.output.kv("ID", item.id.as_str());
    ctx.output.kv("Price", &item.unit_price.to_string());
    ctx.output.kv("Category", &item.category);
    ctx.output.kv("Stock", &stock_badge(&item));
    ctx.output.kv("Rating", &format_rating(item.rating));
    if let Some(url) = &item.image_url {
        ctx.output.kv("Image", url);
    }
    if !item.description.is_empty() {
        ctx.output.info("");
        ctx.output.info(&item.description);
    }

    if !item.specifications.is_empty() {
        ctx.output.info("");
        ctx.output.info("Specifications:");
        for (name, value) in &item.specifications {
            ctx.output.kv(name, value);
        }
    }

    ctx.output.info("");
    match item.review_average() {
        Some(average) => ctx.output.info(&format!(
            "Reviews ({}, average {:.1}):",
            item.reviews.len(),
            average
        )),
        None => ctx.output.info("No reviews yet."),
    }
    for review in &item.reviews {
        ctx.output.list_item(&format!(
            "{} {} ({}): {}",
            format_rating(f32::from(review.rating)),
            review.author,
            format_timestamp(&review.created_at),
            review.comment
        ));
    }

    Ok(())
}

async fn add_review(id: &str, author: &str, rating: u8, comment: &str, ctx: &Context) -> Result<()> {
    let (shop, store) = ctx.storefront()?;
    let id = ItemId::new(id);

    let review = Review::new(author, rating, comment).context("Invalid review")?;
    let _catalog_lock = ctx.lock_catalog(&store, shop.catalog())?;
    shop.add_review(&id, review.clone())?;
    ctx.save_catalog(&store, shop.catalog())?;

    if ctx.output.is_json() {
        ctx.output.json(&review);
        return Ok(());
    }

    ctx.output
        .success(&format!("Review by {} added to {}", review.author, id));
    Ok(())
}

async fn list_categories(ctx: &Context) -> Result<()> {
    let (shop, _store) = ctx.storefront()?;
    let categories = shop.catalog().categories();

    if ctx.output.is_json() {
        ctx.output.json(&categories);
        return Ok(());
    }

    ctx.output.header("Categories");
    for category in &categories {
        ctx.output.list_item(category);
    }
    Ok(())
}
