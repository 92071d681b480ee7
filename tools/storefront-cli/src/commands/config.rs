//! Configuration management commands.

use std::collections::HashSet;
use std::fs;

use anyhow::{bail, Result};

use super::{percent, ConfigArgs, ConfigCommand};
use crate::config::{generate_default_config, CONFIG_FILE_NAMES};
use crate::context::Context;

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx).await,
        ConfigCommand::Init { force } => init_config(force, ctx).await,
        ConfigCommand::Validate => validate_config(ctx).await,
    }
}

async fn show_config(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    match &ctx.config_path {
        Some(path) => ctx.output.kv("file", &path.display().to_string()),
        None => ctx.output.kv("file", "(none, using defaults)"),
    }

    let settings = &ctx.config.settings;

    // Settings section
    ctx.output.info("");
    ctx.output.info("[settings]");
    ctx.output.kv("currency", settings.currency.code());
    ctx.output.kv("tax_rate", &settings.tax_rate.to_string());
    ctx.output.kv("default_delivery", settings.default_delivery.as_str());
    ctx.output
        .kv("payment_timeout_secs", &settings.payment_timeout_secs.to_string());

    ctx.output.info("");
    ctx.output.info("Delivery options:");
    for option in &settings.delivery_options {
        ctx.output
            .list_item(&format!("{}: {}", option.id, option.label()));
    }

    ctx.output.info("");
    ctx.output.info("Discount codes:");
    for code in settings.discount_codes.codes() {
        let state = if code.active { "active" } else { "inactive" };
        ctx.output.list_item(&format!(
            "{} ({}, {}% off, {})",
            code.code,
            code.name,
            percent(code.rate),
            state
        ));
    }

    // Store section
    ctx.output.info("");
    ctx.output.info("[store]");
    ctx.output.kv("path", &ctx.config.store.path);

    // Gateway section
    ctx.output.info("");
    ctx.output.info("[gateway]");
    ctx.output
        .kv("latency_ms", &ctx.config.gateway.latency_ms.to_string());
    if !ctx.config.gateway.declined_methods.is_empty() {
        ctx.output.kv(
            "declined_methods",
            &ctx.config.gateway.declined_methods.join(", "),
        );
    }

    ctx.output.info("");
    ctx.output
        .info(&format!("Catalog seed: {} item(s)", ctx.config.catalog.len()));

    Ok(())
}

async fn init_config(force: bool, ctx: &Context) -> Result<()> {
    let config_path = ctx.cwd.join(CONFIG_FILE_NAMES[0]);

    if config_path.exists() && !force {
        bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    fs::write(&config_path, generate_default_config())?;

    ctx.output.success(&format!("Created: {}", config_path.display()));

    Ok(())
}

async fn validate_config(ctx: &Context) -> Result<()> {
    ctx.output.header("Validating configuration");

    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    if ctx.config_path.is_none() {
        warnings.push("no config file found, using defaults".to_string());
    }

    if let Err(e) = ctx.config.settings.validate() {
        errors.push(format!("settings: {}", e));
    }

    // Check catalog seed
    let mut ids = HashSet::new();
    for (i, item) in ctx.config.catalog.iter().enumerate() {
        if let Err(e) = item.validate() {
            errors.push(format!("catalog[{}]: {}", i, e));
        }
        if !ids.insert(&item.id) {
            errors.push(format!("catalog[{}]: duplicate id '{}'", i, item.id));
        }
        if item.unit_price.currency != ctx.config.settings.currency {
            errors.push(format!(
                "catalog[{}]: priced in {}, shop uses {}",
                i,
                item.unit_price.currency.code(),
                ctx.config.settings.currency.code()
            ));
        }
    }
    if ctx.config.catalog.is_empty() {
        warnings.push("catalog is empty".to_string());
    }

    if ctx.config.store.path.trim().is_empty() {
        errors.push("store.path is required".to_string());
    }

    let timeout_ms = ctx.config.settings.payment_timeout_secs.saturating_mul(1000);
    if ctx.config.gateway.latency_ms >= timeout_ms {
        warnings.push(format!(
            "gateway.latency_ms ({}) exceeds the payment timeout; every payment will time out",
            ctx.config.gateway.latency_ms
        ));
    }

    // Print results
    if errors.is_empty() && warnings.is_empty() {
        ctx.output.success("Configuration is valid");
        return Ok(());
    }

    for error in &errors {
        ctx.output.error(&format!("Error: {}", error));
    }

    for warning in &warnings {
        ctx.output.warn(&format!("Warning: {}", warning));
    }

    if !errors.is_empty() {
        bail!("Configuration has {} error(s)", errors.len());
    }

    ctx.output.success("Configuration is valid (with warnings)");

    Ok(())
}
