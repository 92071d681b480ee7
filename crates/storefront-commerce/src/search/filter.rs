//! Catalog filter types.

use crate::catalog::CatalogItem;
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// A catalog filter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Filter {
    /// Filter by category tag (case-insensitive).
    Category(String),
    /// Filter by price range, bounds inclusive.
    PriceRange {
        min: Option<Money>,
        max: Option<Money>,
    },
    /// Only show in-stock items.
    InStock,
    /// Filter by minimum rating.
    Rating { min: f32 },
    /// Case-insensitive substring search in name/description.
    Text(String),
}

impl Filter {
    /// Create a category filter.
    pub fn category(category: impl Into<String>) -> Self {
        Filter::Category(category.into())
    }

    /// Create a price range filter.
    pub fn price_range(min: Option<Money>, max: Option<Money>) -> Self {
        Filter::PriceRange { min, max }
    }

    /// Create an in-stock filter.
    pub fn in_stock() -> Self {
        Filter::InStock
    }

    /// Create a minimum rating filter.
    pub fn min_rating(min: f32) -> Self {
        Filter::Rating { min }
    }

    /// Create a text search filter.
    pub fn text(query: impl Into<String>) -> Self {
        Filter::Text(query.into())
    }

    /// Whether `item` passes this filter.
    pub fn matches(&self, item: &CatalogItem) -> bool {
        match self {
            Filter::Category(category) => item.category.eq_ignore_ascii_case(category),
            Filter::PriceRange { min, max } => {
                let price = item.unit_price.minor;
                min.map_or(true, |min| price >= min.minor) && max.map_or(true, |max| price <= max.minor)
            }
            Filter::InStock => !item.is_out_of_stock(),
            Filter::Rating { min } => item.rating >= *min,
            Filter::Text(query) => {
                let query = query.to_lowercase();
                item.name.to_lowercase().contains(&query)
                    || item.description.to_lowercase().contains(&query)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    fn dht22() -> CatalogItem {
        CatalogItem::new(
            "dht22",
            "DHT22 Sensor",
            Money::from_major(250, Currency::INR),
            "Sensors",
            8,
        )
        .unwrap()
        .with_description("Digital temperature and humidity sensor")
        .with_rating(4.2)
    }

    #[test]
    fn test_price_range_bounds_inclusive() {
        let item = dht22();
        let filter = Filter::price_range(
            Some(Money::from_major(250, Currency::INR)),
            Some(Money::from_major(250, Currency::INR)),
        );
        assert!(filter.matches(&item));

        let filter = Filter::price_range(None, Some(Money::from_major(249, Currency::INR)));
        assert!(!filter.matches(&item));
    }

    #[test]
    fn test_text_filter_searches_description() {
        let item = dht22();
        assert!(Filter::text("HUMIDITY").matches(&item));
        assert!(Filter::text("dht").matches(&item));
        assert!(!Filter::text("relay").matches(&item));
    }

    #[test]
    fn test_category_and_rating() {
        let item = dht22();
        assert!(Filter::category("sensors").matches(&item));
        assert!(!Filter::category("Kits").matches(&item));
        assert!(Filter::min_rating(4.0).matches(&item));
        assert!(!Filter::min_rating(4.5).matches(&item));
    }

    #[test]
    fn test_in_stock() {
        let mut item = dht22();
        assert!(Filter::in_stock().matches(&item));
        item.stock = 0;
        assert!(!Filter::in_stock().matches(&item));
    }
}
