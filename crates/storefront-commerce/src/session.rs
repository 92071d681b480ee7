//! Per-visitor shopping session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cart::Cart;
use crate::ids::{DeliveryOptionId, ItemId, SessionId};

/// Everything one visitor has chosen so far.
///
/// Owned by the caller and passed by reference to the storefront; nothing
/// here is shared between sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShopSession {
    pub id: SessionId,
    pub cart: Cart,
    /// Saved items, in the order they were added.
    #[serde(default)]
    pub wishlist: Vec<ItemId>,
    /// Selected delivery option.
    pub delivery: DeliveryOptionId,
    /// Last discount code the visitor entered, as typed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ShopSession {
    pub fn new(delivery: DeliveryOptionId) -> Self {
        Self {
            id: SessionId::generate(),
            cart: Cart::new(),
            wishlist: Vec::new(),
            delivery,
            discount_code: None,
            created_at: Utc::now(),
        }
    }

    /// Add `item_id` to the wishlist, or remove it if present.
    /// Returns whether the item is wishlisted afterwards.
    pub fn toggle_wishlist(&mut self, item_id: &ItemId) -> bool {
        match self.wishlist.iter().position(|id| id == item_id) {
            Some(index) => {
                self.wishlist.remove(index);
                false
            }
            None => {
                self.wishlist.push(item_id.clone());
                true
            }
        }
    }

    pub fn is_wishlisted(&self, item_id: &ItemId) -> bool {
        self.wishlist.contains(item_id)
    }

    /// Remember a discount code; blank input clears it.
    pub fn set_discount_code(&mut self, code: Option<&str>) {
        self.discount_code = code
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
    }
}
