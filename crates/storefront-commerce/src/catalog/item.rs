//! Catalog item and review types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CommerceError;
use crate::ids::ItemId;
use crate::money::Money;

/// Items with fewer units than this show a "Low Stock" badge.
pub const LOW_STOCK_THRESHOLD: u32 = 20;

/// Highest rating an item or review can carry.
pub const MAX_RATING: u8 = 5;

/// A purchasable item in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogItem {
    /// Unique, stable identifier.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Long description, searched by free-text queries.
    #[serde(default)]
    pub description: String,
    /// Price of one unit.
    pub unit_price: Money,
    /// Category tag (e.g. "Microcontrollers").
    pub category: String,
    /// Units available for sale.
    pub stock: u32,
    /// Average rating, 0 to 5.
    #[serde(default)]
    pub rating: f32,
    /// Product image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Technical specifications, name to value.
    #[serde(default)]
    pub specifications: BTreeMap<String, String>,
    /// Customer reviews, oldest first.
    #[serde(default)]
    pub reviews: Vec<Review>,
}

impl CatalogItem {
    /// Create a validated item.
    pub fn new(
        id: impl Into<ItemId>,
        name: impl Into<String>,
        unit_price: Money,
        category: impl Into<String>,
        stock: u32,
    ) -> Result<Self, CommerceError> {
        let item = Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            unit_price,
            category: category.into(),
            stock,
            rating: 0.0,
            image_url: None,
            specifications: BTreeMap::new(),
            reviews: Vec::new(),
        };
        item.validate()?;
        Ok(item)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_rating(mut self, rating: f32) -> Self {
        self.rating = rating;
        self
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn with_specification(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.specifications.insert(name.into(), value.into());
        self
    }

    /// Check the item's invariants.
    pub fn validate(&self) -> Result<(), CommerceError> {
        if self.id.as_str().trim().is_empty() {
            return Err(CommerceError::ValidationError(
                "item id must not be empty".into(),
            ));
        }
        if self.name.trim().is_empty() {
            return Err(CommerceError::ValidationError(format!(
                "item {} has an empty name",
                self.id
            )));
        }
        if self.unit_price.is_negative() {
            return Err(CommerceError::ValidationError(format!(
                "item {} has a negative price",
                self.id
            )));
        }
        if !(0.0..=f32::from(MAX_RATING)).contains(&self.rating) {
            return Err(CommerceError::ValidationError(format!(
                "item {} rating {} is outside 0-{}",
                self.id, self.rating, MAX_RATING
            )));
        }
        self.reviews.iter().try_for_each(Review::validate)
    }

    /// Check if out of stock.
    pub fn is_out_of_stock(&self) -> bool {
        self.stock == 0
    }

    /// Check if stock is low (below threshold) but not gone.
    pub fn is_low_stock(&self) -> bool {
        self.stock > 0 && self.stock < LOW_STOCK_THRESHOLD
    }

    /// Check if a specific quantity can be sold.
    pub fn can_fulfill(&self, quantity: u32) -> bool {
        quantity <= self.stock
    }

    /// Mean of the review ratings, if any reviews exist.
    pub fn review_average(&self) -> Option<f32> {
        if self.reviews.is_empty() {
            return None;
        }
        let total: u32 = self.reviews.iter().map(|r| u32::from(r.rating)).sum();
        Some(total as f32 / self.reviews.len() as f32)
    }
}

/// A customer review.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Review {
    pub author: String,
    /// Stars, 1 to 5.
    pub rating: u8,
    pub comment: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Review {
    /// Create a validated review. An empty author is recorded as "Guest".
    pub fn new(
        author: impl Into<String>,
        rating: u8,
        comment: impl Into<String>,
    ) -> Result<Self, CommerceError> {
        let author = author.into();
        let review = Self {
            author: if author.trim().is_empty() {
                "Guest".to_string()
            } else {
                author
            },
            rating,
            comment: comment.into(),
            created_at: Utc::now(),
        };
        review.validate()?;
        Ok(review)
    }

    pub fn validate(&self) -> Result<(), CommerceError> {
        if !(1..=MAX_RATING).contains(&self.rating) {
            return Err(CommerceError::ValidationError(format!(
                "review rating {} is outside 1-{}",
                self.rating, MAX_RATING
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    fn arduino() -> CatalogItem {
        CatalogItem::new(
            "arduino-uno",
            "Arduino Uno R3 Microcontroller",
            Money::from_major(699, Currency::INR),
            "Microcontrollers",
            50,
        )
        .unwrap()
    }

    #[test]
    fn test_item_creation() {
        let item = arduino()
            .with_rating(4.8)
            .with_specification("Operating Voltage", "5V");
        assert_eq!(item.unit_price.minor, 69900);
        assert_eq!(item.specifications["Operating Voltage"], "5V");
        assert!(item.validate().is_ok());
    }

    #[test]
    fn test_item_rejects_negative_price() {
        let result = CatalogItem::new("x", "X", Money::new(-1, Currency::INR), "Kits", 1);
        assert!(matches!(result, Err(CommerceError::ValidationError(_))));
    }

    #[test]
    fn test_item_rejects_empty_name() {
        let result = CatalogItem::new("x", "  ", Money::new(100, Currency::INR), "Kits", 1);
        assert!(result.is_err());
    }

    #[test]
    fn test_item_rejects_rating_out_of_range() {
        let item = arduino().with_rating(5.5);
        assert!(item.validate().is_err());
    }

    #[test]
    fn test_stock_badges() {
        let mut item = arduino();
        assert!(!item.is_low_stock());

        item.stock = 19;
        assert!(item.is_low_stock());
        assert!(item.can_fulfill(19));
        assert!(!item.can_fulfill(20));

        item.stock = 0;
        assert!(item.is_out_of_stock());
        assert!(!item.is_low_stock());
    }

    #[test]
    fn test_review_validation() {
        assert!(Review::new("John", 5, "Great for beginners!").is_ok());
        assert!(Review::new("John", 0, "meh").is_err());
        assert!(Review::new("John", 6, "wow").is_err());
        assert_eq!(Review::new("", 4, "ok").unwrap().author, "Guest");
    }

    #[test]
    fn test_review_average() {
        let mut item = arduino();
        assert_eq!(item.review_average(), None);

        item.reviews.push(Review::new("a", 5, "").unwrap());
        item.reviews.push(Review::new("b", 4, "").unwrap());
        assert_eq!(item.review_average(), Some(4.5));
    }
}
