//! Cart and cart line types.

use crate::catalog::Catalog;
use crate::error::CommerceError;
use crate::ids::ItemId;
use serde::{Deserialize, Serialize};

/// A shopping cart.
///
/// Lines keep insertion order and never repeat an item. Every mutation checks
/// the catalog's current stock, and a failed mutation leaves the cart as it was.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Create an empty cart.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `quantity` units of an item, creating the line if needed.
    ///
    /// Returns the line's new quantity. Returns an error if:
    /// - Quantity is zero
    /// - The item is unknown or out of stock
    /// - The resulting quantity would exceed the item's stock
    pub fn add(
        &mut self,
        catalog: &Catalog,
        item_id: &ItemId,
        quantity: u32,
    ) -> Result<u32, CommerceError> {
        if quantity == 0 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }

        let stock = catalog.stock_of(item_id)?;
        if stock == 0 {
            return Err(CommerceError::OutOfStock {
                item_id: item_id.to_string(),
            });
        }

        let current = self.quantity_of(item_id);
        let requested = current
            .checked_add(quantity)
            .ok_or(CommerceError::Overflow)?;

        if requested > stock {
            return Err(CommerceError::StockLimitExceeded {
                item_id: item_id.to_string(),
                requested,
                available: stock,
            });
        }

        match self.lines.iter_mut().find(|l| &l.item_id == item_id) {
            Some(line) => line.quantity = requested,
            None => self.lines.push(CartLine {
                item_id: item_id.clone(),
                quantity: requested,
            }),
        }
        Ok(requested)
    }

    /// Replace the quantity of an existing line.
    ///
    /// A quantity of 0 removes the line.
    pub fn set_quantity(
        &mut self,
        catalog: &Catalog,
        item_id: &ItemId,
        quantity: u32,
    ) -> Result<(), CommerceError> {
        if self.quantity_of(item_id) == 0 {
            return Err(CommerceError::ItemNotInCart(item_id.to_string()));
        }

        if quantity == 0 {
            self.remove(item_id);
            return Ok(());
        }

        let stock = catalog.stock_of(item_id)?;
        if quantity > stock {
            return Err(CommerceError::StockLimitExceeded {
                item_id: item_id.to_string(),
                requested: quantity,
                available: stock,
            });
        }

        if let Some(line) = self.lines.iter_mut().find(|l| &l.item_id == item_id) {
            line.quantity = quantity;
        }
        Ok(())
    }

    /// Remove an item from the cart. Returns whether it was present.
    pub fn remove(&mut self, item_id: &ItemId) -> bool {
        let len_before = self.lines.len();
        self.lines.retain(|l| &l.item_id != item_id);
        self.lines.len() < len_before
    }

    /// Take up to `quantity` units of an item out of the cart, dropping the
    /// line when nothing is left. Used once those units have been bought.
    pub fn deduct(&mut self, item_id: &ItemId, quantity: u32) {
        if let Some(line) = self.lines.iter_mut().find(|l| &l.item_id == item_id) {
            line.quantity = line.quantity.saturating_sub(quantity);
        }
        self.lines.retain(|l| l.quantity > 0);
    }

    /// Clear all items from the cart.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Lines in insertion order.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Check if cart is empty.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Get total item count (sum of quantities).
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }

    /// Quantity of an item in the cart, 0 if absent.
    pub fn quantity_of(&self, item_id: &ItemId) -> u32 {
        self.lines
            .iter()
            .find(|l| &l.item_id == item_id)
            .map_or(0, |l| l.quantity)
    }

    /// Check every line against the catalog's current stock.
    ///
    /// Stock can drop after an item was added (another checkout, a refresh),
    /// so checkout calls this before pricing.
    pub fn revalidate(&self, catalog: &Catalog) -> Result<(), CommerceError> {
        for line in &self.lines {
            let stock = catalog.stock_of(&line.item_id)?;
            if line.quantity > stock {
                return Err(CommerceError::StockLimitExceeded {
                    item_id: line.item_id.to_string(),
                    requested: line.quantity,
                    available: stock,
                });
            }
        }
        Ok(())
    }
}

/// A line in the cart.
///
/// Refers to a catalog item by id only; name and price are read from the
/// catalog when the cart is priced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartLine {
    pub item_id: ItemId,
    /// Always at least 1.
    pub quantity: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogItem;
    use crate::money::{Currency, Money};

    fn catalog() -> Catalog {
        Catalog::new(vec![
            CatalogItem::new("a", "Item A", Money::from_major(100, Currency::INR), "Kits", 3).unwrap(),
            CatalogItem::new("b", "Item B", Money::from_major(50, Currency::INR), "Kits", 10).unwrap(),
            CatalogItem::new("gone", "Gone", Money::from_major(10, Currency::INR), "Kits", 0).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_cart_creation() {
        let cart = Cart::new();
        assert!(cart.is_empty());
        assert_eq!(cart.item_count(), 0);
    }

    #[test]
    fn test_add_item() {
        let catalog = catalog();
        let mut cart = Cart::new();
        assert_eq!(cart.add(&catalog, &ItemId::new("a"), 2).unwrap(), 2);

        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.lines().len(), 1);
    }

    #[test]
    fn test_add_same_item_increases_quantity() {
        let catalog = catalog();
        let mut cart = Cart::new();
        let id = ItemId::new("b");

        cart.add(&catalog, &id, 1).unwrap();
        cart.add(&catalog, &id, 1).unwrap();

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.quantity_of(&id), 2);
    }

    #[test]
    fn test_add_beyond_stock_leaves_cart_unchanged() {
        let catalog = catalog();
        let mut cart = Cart::new();
        let id = ItemId::new("a");

        cart.add(&catalog, &id, 2).unwrap();
        let err = cart.add(&catalog, &id, 2).unwrap_err();

        assert!(matches!(
            err,
            CommerceError::StockLimitExceeded {
                requested: 4,
                available: 3,
                ..
            }
        ));
        assert_eq!(cart.quantity_of(&id), 2);
    }

    #[test]
    fn test_deduct_keeps_what_was_not_bought() {
        let catalog = catalog();
        let mut cart = Cart::new();
        cart.add(&catalog, &ItemId::new("a"), 2).unwrap();
        cart.add(&catalog, &ItemId::new("b"), 3).unwrap();

        cart.deduct(&ItemId::new("a"), 2);
        cart.deduct(&ItemId::new("b"), 1);
        cart.deduct(&ItemId::new("nope"), 1);

        assert_eq!(cart.quantity_of(&ItemId::new("a")), 0);
        assert_eq!(cart.quantity_of(&ItemId::new("b")), 2);
        assert_eq!(cart.lines().len(), 1);
    }

    #[test]
    fn test_add_rejects_bad_input() {
        let catalog = catalog();
        let mut cart = Cart::new();

        assert!(matches!(
            cart.add(&catalog, &ItemId::new("gone"), 1),
            Err(CommerceError::OutOfStock { .. })
        ));
        assert!(matches!(
            cart.add(&catalog, &ItemId::new("a"), 0),
            Err(CommerceError::InvalidQuantity(0))
        ));
        assert!(matches!(
            cart.add(&catalog, &ItemId::new("nope"), 1),
            Err(CommerceError::ItemNotFound(_))
        ));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity() {
        let catalog = catalog();
        let mut cart = Cart::new();
        let id = ItemId::new("b");
        cart.add(&catalog, &id, 1).unwrap();

        cart.set_quantity(&catalog, &id, 7).unwrap();
        assert_eq!(cart.quantity_of(&id), 7);

        let err = cart.set_quantity(&catalog, &id, 11).unwrap_err();
        assert!(matches!(err, CommerceError::StockLimitExceeded { .. }));
        assert_eq!(cart.quantity_of(&id), 7);

        cart.set_quantity(&catalog, &id, 0).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_on_absent_line() {
        let catalog = catalog();
        let mut cart = Cart::new();
        assert!(matches!(
            cart.set_quantity(&catalog, &ItemId::new("a"), 1),
            Err(CommerceError::ItemNotInCart(_))
        ));
    }

    #[test]
    fn test_remove_and_clear() {
        let catalog = catalog();
        let mut cart = Cart::new();
        cart.add(&catalog, &ItemId::new("a"), 1).unwrap();
        cart.add(&catalog, &ItemId::new("b"), 1).unwrap();

        assert!(cart.remove(&ItemId::new("a")));
        assert!(!cart.remove(&ItemId::new("a")));
        assert_eq!(cart.lines().len(), 1);

        cart.clear();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_lines_keep_insertion_order() {
        let catalog = catalog();
        let mut cart = Cart::new();
        cart.add(&catalog, &ItemId::new("b"), 1).unwrap();
        cart.add(&catalog, &ItemId::new("a"), 1).unwrap();
        cart.add(&catalog, &ItemId::new("b"), 1).unwrap();

        let ids: Vec<_> = cart.lines().iter().map(|l| l.item_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_revalidate_after_stock_drop() {
        let catalog = catalog();
        let mut cart = Cart::new();
        let id = ItemId::new("a");
        cart.add(&catalog, &id, 3).unwrap();
        assert!(cart.revalidate(&catalog).is_ok());

        catalog.decrement_stock(&id, 2).unwrap();
        assert!(matches!(
            cart.revalidate(&catalog),
            Err(CommerceError::StockLimitExceeded { available: 1, .. })
        ));
    }

    #[test]
    fn test_random_operations_respect_stock() {
        let catalog = catalog();
        let mut cart = Cart::new();
        let ids = [ItemId::new("a"), ItemId::new("b"), ItemId::new("gone")];

        for step in 0u32..200 {
            let id = &ids[(step as usize * 7) % ids.len()];
            let qty = (step * 13) % 5;
            let _ = match step % 3 {
                0 => cart.add(&catalog, id, qty).map(|_| ()),
                1 => cart.set_quantity(&catalog, id, qty),
                _ => {
                    cart.remove(id);
                    Ok(())
                }
            };

            for line in cart.lines() {
                assert!(line.quantity >= 1);
                assert!(line.quantity <= catalog.stock_of(&line.item_id).unwrap());
            }
        }
    }
}
