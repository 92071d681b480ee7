//! The shared, internally synchronized catalog.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::catalog::{CatalogItem, Review};
use crate::error::CommerceError;
use crate::ids::ItemId;
use crate::search::SearchQuery;

/// The list of purchasable items.
///
/// Read-mostly; shared between sessions behind an `Arc`. Stock changes happen
/// under the write lock so a check and its subtraction cannot interleave with
/// another checkout.
#[derive(Debug, Default)]
pub struct Catalog {
    items: RwLock<Vec<CatalogItem>>,
}

impl Catalog {
    /// Build a catalog, rejecting invalid items and duplicate ids.
    pub fn new(items: Vec<CatalogItem>) -> Result<Self, CommerceError> {
        validate_items(&items)?;
        Ok(Self {
            items: RwLock::new(items),
        })
    }

    /// All items in catalog order.
    pub fn list(&self) -> Vec<CatalogItem> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Look up an item by id.
    pub fn get(&self, id: &ItemId) -> Result<CatalogItem, CommerceError> {
        self.read()
            .iter()
            .find(|item| &item.id == id)
            .cloned()
            .ok_or_else(|| CommerceError::ItemNotFound(id.to_string()))
    }

    /// Current stock of an item.
    pub fn stock_of(&self, id: &ItemId) -> Result<u32, CommerceError> {
        self.read()
            .iter()
            .find(|item| &item.id == id)
            .map(|item| item.stock)
            .ok_or_else(|| CommerceError::ItemNotFound(id.to_string()))
    }

    /// Remove `quantity` units from stock, returning what remains.
    ///
    /// Fails with `InsufficientStock` and changes nothing if `quantity`
    /// exceeds the stock on hand.
    pub fn decrement_stock(&self, id: &ItemId, quantity: u32) -> Result<u32, CommerceError> {
        if quantity == 0 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }

        let mut items = self.write();
        let item = items
            .iter_mut()
            .find(|item| &item.id == id)
            .ok_or_else(|| CommerceError::ItemNotFound(id.to_string()))?;

        if quantity > item.stock {
            return Err(CommerceError::InsufficientStock {
                item_id: id.to_string(),
                requested: quantity,
                available: item.stock,
            });
        }

        item.stock -= quantity;
        Ok(item.stock)
    }

    /// Add `quantity` units to stock, returning the new level.
    pub fn restock(&self, id: &ItemId, quantity: u32) -> Result<u32, CommerceError> {
        let mut items = self.write();
        let item = items
            .iter_mut()
            .find(|item| &item.id == id)
            .ok_or_else(|| CommerceError::ItemNotFound(id.to_string()))?;

        item.stock = item
            .stock
            .checked_add(quantity)
            .ok_or(CommerceError::Overflow)?;
        Ok(item.stock)
    }

    /// Replace the catalog contents. On error the old contents stay.
    pub fn refresh(&self, items: Vec<CatalogItem>) -> Result<(), CommerceError> {
        validate_items(&items)?;
        let count = items.len();
        *self.write() = items;
        tracing::debug!(items = count, "catalog refreshed");
        Ok(())
    }

    /// Append a review to an item.
    pub fn add_review(&self, id: &ItemId, review: Review) -> Result<(), CommerceError> {
        review.validate()?;
        let mut items = self.write();
        let item = items
            .iter_mut()
            .find(|item| &item.id == id)
            .ok_or_else(|| CommerceError::ItemNotFound(id.to_string()))?;
        item.reviews.push(review);
        Ok(())
    }

    /// Distinct categories, in first-seen order.
    pub fn categories(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.read()
            .iter()
            .filter(|item| seen.insert(item.category.clone()))
            .map(|item| item.category.clone())
            .collect()
    }

    /// Filter and sort the catalog.
    pub fn search(&self, query: &SearchQuery) -> Vec<CatalogItem> {
        query.apply(self.read().iter())
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<CatalogItem>> {
        self.items.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<CatalogItem>> {
        self.items.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn validate_items(items: &[CatalogItem]) -> Result<(), CommerceError> {
    let mut ids = HashSet::new();
    for item in items {
        item.validate()?;
        if !ids.insert(&item.id) {
            return Err(CommerceError::ValidationError(format!(
                "duplicate catalog item id: {}",
                item.id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::{Currency, Money};
    use crate::search::SortOption;
    use std::sync::Arc;

    fn item(id: &str, price: i64, category: &str, stock: u32) -> CatalogItem {
        CatalogItem::new(id, id, Money::from_major(price, Currency::INR), category, stock).unwrap()
    }

    fn catalog() -> Catalog {
        Catalog::new(vec![
            item("uno", 699, "Microcontrollers", 5),
            item("dht22", 250, "Sensors", 3),
            item("esp32", 450, "Microcontrollers", 0),
        ])
        .unwrap()
    }

    #[test]
    fn test_get_and_not_found() {
        let catalog = catalog();
        assert_eq!(catalog.get(&ItemId::new("uno")).unwrap().stock, 5);
        assert!(matches!(
            catalog.get(&ItemId::new("missing")),
            Err(CommerceError::ItemNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = Catalog::new(vec![item("uno", 1, "A", 1), item("uno", 2, "B", 1)]);
        assert!(matches!(result, Err(CommerceError::ValidationError(_))));
    }

    #[test]
    fn test_decrement_stock() {
        let catalog = catalog();
        let id = ItemId::new("dht22");

        assert_eq!(catalog.decrement_stock(&id, 2).unwrap(), 1);
        let err = catalog.decrement_stock(&id, 2).unwrap_err();
        assert!(matches!(
            err,
            CommerceError::InsufficientStock {
                requested: 2,
                available: 1,
                ..
            }
        ));
        assert_eq!(catalog.stock_of(&id).unwrap(), 1);
    }

    #[test]
    fn test_concurrent_decrements_never_overdraw() {
        let catalog = Arc::new(catalog());
        let id = ItemId::new("uno");

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let catalog = Arc::clone(&catalog);
                let id = id.clone();
                std::thread::spawn(move || catalog.decrement_stock(&id, 1).is_ok())
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(successes, 5);
        assert_eq!(catalog.stock_of(&id).unwrap(), 0);
    }

    #[test]
    fn test_restock_and_refresh() {
        let catalog = catalog();
        let id = ItemId::new("esp32");
        assert_eq!(catalog.restock(&id, 4).unwrap(), 4);

        catalog.refresh(vec![item("relay", 120, "Actuators", 9)]).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get(&id).is_err());

        let bad = vec![item("a", 1, "A", 1), item("a", 1, "A", 1)];
        assert!(catalog.refresh(bad).is_err());
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_add_review() {
        let catalog = catalog();
        let id = ItemId::new("uno");
        catalog
            .add_review(&id, Review::new("John", 5, "Great for beginners!").unwrap())
            .unwrap();
        assert_eq!(catalog.get(&id).unwrap().reviews.len(), 1);
    }

    #[test]
    fn test_categories_first_seen_order() {
        assert_eq!(catalog().categories(), vec!["Microcontrollers", "Sensors"]);
    }

    #[test]
    fn test_search() {
        let results = catalog().search(
            &SearchQuery::new()
                .with_category("Microcontrollers")
                .with_sort(SortOption::PriceAsc),
        );
        let ids: Vec<_> = results.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["esp32", "uno"]);
    }
}
