//! CLI configuration.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use storefront_commerce::catalog::CatalogItem;
use storefront_commerce::ShopSettings;

/// Config file names looked up when no `--config` is given, in order.
pub const CONFIG_FILE_NAMES: [&str; 3] = ["storefront.toml", ".storefront.toml", "storefront.json"];

/// CLI configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Tax, delivery, discount and payment settings.
    #[serde(default)]
    pub settings: ShopSettings,

    /// Where orders and the catalog snapshot are kept.
    #[serde(default)]
    pub store: StoreConfig,

    /// Simulated payment gateway behavior.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Catalog used to seed the store on first run.
    #[serde(default)]
    pub catalog: Vec<CatalogItem>,
}

impl CliConfig {
    /// Load config from a file; `.json` files are JSON, anything else TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
        }
    }
}

/// Store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store file, relative to the working directory unless absolute.
    #[serde(default = "default_store_path")]
    pub path: String,
}

fn default_store_path() -> String {
    ".storefront/store.json".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// Simulated gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// How long the gateway takes to answer.
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,

    /// Payment method tokens that are always declined.
    #[serde(default)]
    pub declined_methods: Vec<String>,
}

fn default_latency_ms() -> u64 {
    800
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            latency_ms: default_latency_ms(),
            declined_methods: Vec::new(),
        }
    }
}

/// Generate a default storefront.toml config file.
pub fn generate_default_config() -> String {
    r#"# Storefront configuration

[settings]
currency = "INR"
tax_rate = "0.18"
default_delivery = "standard"
payment_timeout_secs = 30

[[settings.delivery_options]]
id = "standard"
name = "Standard Delivery"
cost = { minor = 5000, currency = "INR" }
estimated_days = "5-7 days"

[[settings.delivery_options]]
id = "express"
name = "Express Delivery"
cost = { minor = 15000, currency = "INR" }
estimated_days = "1-2 days"

[[settings.discount_codes]]
code = "SAVE10"
name = "10% off"
rate = "0.10"

[store]
path = ".storefront/store.json"

[gateway]
latency_ms = 800
# Tokens starting with "tok_decline" are always declined.
declined_methods = []

[[catalog]]
id = "arduino-uno-r3"
name = "Arduino Uno R3 Microcontroller"
description = "The Arduino Uno is a microcontroller board based on the ATmega328P. Perfect for beginners and advanced projects."
unit_price = { minor = 69900, currency = "INR" }
category = "Microcontrollers"
stock = 50
rating = 4.8
image_url = "https://images.unsplash.com/photo-1518770660439-4636190af475"
specifications = { "Microcontroller" = "ATmega328P", "Operating Voltage" = "5V", "Digital I/O Pins" = "14" }
reviews = [{ author = "John", rating = 5, comment = "Great for beginners!", created_at = "2025-01-10T09:30:00Z" }]

[[catalog]]
id = "esp32-devkit"
name = "ESP32 DevKit V1"
description = "Dual-core Wi-Fi and Bluetooth board for connected sensors."
unit_price = { minor = 45000, currency = "INR" }
category = "Microcontrollers"
stock = 40
rating = 4.6

[[catalog]]
id = "dht22"
name = "DHT22 Temperature & Humidity Sensor"
description = "Calibrated digital output, -40 to 80 C."
unit_price = { minor = 25000, currency = "INR" }
category = "Sensors"
stock = 15
rating = 4.3

[[catalog]]
id = "relay-4ch"
name = "4-Channel 5V Relay Module"
description = "Optically isolated relays for switching mains loads."
unit_price = { minor = 18000, currency = "INR" }
category = "Modules"
stock = 0
rating = 4.1
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses_and_validates() {
        let config: CliConfig = toml::from_str(&generate_default_config()).unwrap();

        config.settings.validate().unwrap();
        assert_eq!(config.settings.delivery_options.len(), 2);
        assert_eq!(config.catalog.len(), 4);
        assert_eq!(config.catalog[0].reviews.len(), 1);
        assert_eq!(config.catalog[0].specifications["Operating Voltage"], "5V");
        assert!(config.catalog.iter().all(|item| item.validate().is_ok()));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: CliConfig = toml::from_str("").unwrap();
        assert_eq!(config.store.path, ".storefront/store.json");
        assert_eq!(config.gateway.latency_ms, 800);
        assert!(config.catalog.is_empty());
    }
}
