//! The storefront: settings, catalog and checkout wired together.
//!
//! [`Storefront`] is what a front end talks to. It holds the pieces shared by
//! every visitor and takes each visitor's [`ShopSession`] by reference.
//! Checkout attempts are tracked per session, so one visitor's checkout
//! never supersedes or completes another's.
//!
//! ```rust,ignore
//! let mut shop = Storefront::new(settings, catalog, gateway, OrderBook::in_memory())?;
//! let mut session = shop.open_session()?;
//! shop.add_to_cart(&mut session, &ItemId::new("esp32"), 2)?;
//! let quote = shop.quote(&session)?;
//! let receipt = shop.checkout(&mut session, "tok_visa").await?;
//! ```

use std::sync::Arc;

use crate::cart::{DiscountCode, PriceSummary};
use crate::catalog::{Catalog, CatalogItem, Review};
use crate::checkout::{
    CheckoutCoordinator, CheckoutReceipt, CheckoutState, DeliveryOption, PaymentConfirmation,
    PaymentGateway, PendingPayment,
};
use crate::config::ShopSettings;
use crate::error::CommerceError;
use crate::ids::{DeliveryOptionId, ItemId};
use crate::orders::OrderBook;
use crate::search::SearchQuery;
use crate::session::ShopSession;

pub struct Storefront {
    settings: ShopSettings,
    catalog: Arc<Catalog>,
    checkout: CheckoutCoordinator,
}

impl Storefront {
    /// Wire up a storefront. Fails if the settings are inconsistent.
    pub fn new(
        settings: ShopSettings,
        catalog: Arc<Catalog>,
        gateway: Arc<dyn PaymentGateway>,
        orders: OrderBook,
    ) -> Result<Self, CommerceError> {
        settings.validate()?;

        let checkout = CheckoutCoordinator::new(
            gateway,
            orders,
            settings.pricing_engine(),
            settings.discount_codes.clone(),
        )
        .with_timeout(settings.payment_timeout());

        tracing::debug!(
            items = catalog.len(),
            delivery_options = settings.delivery_options.len(),
            currency = settings.currency.code(),
            "storefront ready"
        );

        Ok(Self {
            settings,
            catalog,
            checkout,
        })
    }

    pub fn settings(&self) -> &ShopSettings {
        &self.settings
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn orders(&self) -> &OrderBook {
        self.checkout.orders()
    }

    /// A new session with an empty cart and the default delivery option.
    pub fn open_session(&self) -> Result<ShopSession, CommerceError> {
        let delivery = self.settings.default_delivery_option()?;
        Ok(ShopSession::new(delivery.id.clone()))
    }

    pub fn add_to_cart(
        &self,
        session: &mut ShopSession,
        item_id: &ItemId,
        quantity: u32,
    ) -> Result<u32, CommerceError> {
        session.cart.add(&self.catalog, item_id, quantity)
    }

    pub fn set_quantity(
        &self,
        session: &mut ShopSession,
        item_id: &ItemId,
        quantity: u32,
    ) -> Result<(), CommerceError> {
        session.cart.set_quantity(&self.catalog, item_id, quantity)
    }

    pub fn remove_from_cart(&self, session: &mut ShopSession, item_id: &ItemId) -> bool {
        session.cart.remove(item_id)
    }

    /// Select a delivery option for the session.
    pub fn select_delivery(
        &self,
        session: &mut ShopSession,
        id: &DeliveryOptionId,
    ) -> Result<&DeliveryOption, CommerceError> {
        let option = self.settings.delivery_option(id)?;
        session.delivery = option.id.clone();
        Ok(option)
    }

    /// Apply a discount code to the session.
    ///
    /// A refused code is reported and the session keeps whatever code it had.
    pub fn apply_discount(
        &self,
        session: &mut ShopSession,
        code: &str,
    ) -> Result<&DiscountCode, CommerceError> {
        let resolved = self.settings.discount_codes.resolve(code)?;
        session.set_discount_code(Some(&resolved.code));
        Ok(resolved)
    }

    pub fn clear_discount(&self, session: &mut ShopSession) {
        session.set_discount_code(None);
    }

    /// Price the session's cart as it stands.
    pub fn quote(&self, session: &ShopSession) -> Result<PriceSummary, CommerceError> {
        let delivery = self.settings.delivery_option(&session.delivery)?;
        let discount = self
            .settings
            .discount_codes
            .resolve_optional(session.discount_code.as_deref());
        self.settings
            .pricing_engine()
            .price(&session.cart, &self.catalog, delivery, discount.rate())
    }

    /// Validate and price the session's cart, ready for payment.
    pub fn begin_checkout(&mut self, session: &ShopSession) -> Result<PendingPayment, CommerceError> {
        let delivery = self.settings.delivery_option(&session.delivery)?;
        self.checkout.begin(
            &session.id,
            &session.cart,
            &self.catalog,
            delivery,
            session.discount_code.as_deref(),
        )
    }

    /// Apply a payment answer to the session's current attempt.
    ///
    /// Answers for any other attempt, including another session's, fail with
    /// [`CommerceError::StaleAttempt`] and leave the session untouched.
    pub fn confirm_checkout(
        &mut self,
        session: &mut ShopSession,
        confirmation: PaymentConfirmation,
    ) -> Result<CheckoutReceipt, CommerceError> {
        let receipt = self.checkout.confirm(
            &session.id,
            &mut session.cart,
            &self.catalog,
            confirmation,
        )?;
        session.set_discount_code(None);
        Ok(receipt)
    }

    /// Check out the session's cart in one go.
    pub async fn checkout(
        &mut self,
        session: &mut ShopSession,
        payment_method: &str,
    ) -> Result<CheckoutReceipt, CommerceError> {
        let pending = self.begin_checkout(session)?;
        let confirmation = pending.authorize(payment_method).await;
        self.confirm_checkout(session, confirmation)
    }

    pub fn checkout_state(&self, session: &ShopSession) -> CheckoutState {
        self.checkout.state(&session.id)
    }

    /// Forget the session's checkout attempt once the visitor has left.
    pub fn close_session(&mut self, session: &ShopSession) {
        self.checkout.forget(&session.id);
    }

    pub fn search(&self, query: &SearchQuery) -> Vec<CatalogItem> {
        self.catalog.search(query)
    }

    pub fn add_review(&self, item_id: &ItemId, review: Review) -> Result<(), CommerceError> {
        self.catalog.add_review(item_id, review)
    }
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("settings", &self.settings)
            .field("checkout", &self.checkout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::SimulatedGateway;
    use crate::money::{Currency, Money};
    use rust_decimal::Decimal;
    use std::time::Duration;

    fn shop() -> Storefront {
        let catalog = Catalog::new(vec![
            CatalogItem::new("a", "Item A", Money::from_major(100, Currency::INR), "Kits", 5)
                .unwrap(),
            CatalogItem::new("b", "Item B", Money::from_major(50, Currency::INR), "Kits", 5)
                .unwrap(),
        ])
        .unwrap();
        Storefront::new(
            ShopSettings::default(),
            Arc::new(catalog),
            SimulatedGateway::new(Duration::ZERO).shared(),
            OrderBook::in_memory(),
        )
        .unwrap()
    }

    fn inr(major: i64) -> Money {
        Money::from_major(major, Currency::INR)
    }

    #[test]
    fn test_quote_follows_session_choices() {
        let shop = shop();
        let mut session = shop.open_session().unwrap();
        shop.add_to_cart(&mut session, &ItemId::new("a"), 2).unwrap();
        shop.add_to_cart(&mut session, &ItemId::new("b"), 1).unwrap();

        assert_eq!(shop.quote(&session).unwrap().total_money().unwrap(), inr(345));

        shop.apply_discount(&mut session, " save10 ").unwrap();
        assert_eq!(session.discount_code.as_deref(), Some("SAVE10"));
        assert_eq!(shop.quote(&session).unwrap().total_money().unwrap(), inr(320));

        shop.select_delivery(&mut session, &DeliveryOptionId::new("express"))
            .unwrap();
        let quote = shop.quote(&session).unwrap();
        assert_eq!(quote.total_money().unwrap(), inr(420));
        assert_eq!(quote.discount_rate, Decimal::new(10, 2));
    }

    #[test]
    fn test_refused_discount_keeps_previous_code() {
        let shop = shop();
        let mut session = shop.open_session().unwrap();
        shop.apply_discount(&mut session, "SAVE10").unwrap();

        let err = shop.apply_discount(&mut session, "FREEBIE").unwrap_err();
        assert!(matches!(err, CommerceError::InvalidDiscountCode { .. }));
        assert_eq!(session.discount_code.as_deref(), Some("SAVE10"));
    }

    #[test]
    fn test_unknown_delivery_option_rejected() {
        let shop = shop();
        let mut session = shop.open_session().unwrap();
        assert!(shop
            .select_delivery(&mut session, &DeliveryOptionId::new("drone"))
            .is_err());
        assert_eq!(session.delivery.as_str(), "standard");
    }

    #[tokio::test]
    async fn test_checkout_through_storefront() {
        let mut shop = shop();
        let mut session = shop.open_session().unwrap();
        shop.add_to_cart(&mut session, &ItemId::new("a"), 1).unwrap();
        shop.apply_discount(&mut session, "SAVE10").unwrap();

        let receipt = shop.checkout(&mut session, "tok_visa").await.unwrap();
        assert_eq!(receipt.order.total, inr(158));
        assert!(session.cart.is_empty());
        assert_eq!(session.discount_code, None);
        assert_eq!(shop.orders().list().unwrap().len(), 1);
        assert_eq!(shop.checkout_state(&session), CheckoutState::Succeeded);

        shop.close_session(&session);
        assert_eq!(shop.checkout_state(&session), CheckoutState::Idle);
    }

    #[tokio::test]
    async fn test_confirmation_for_another_session_is_refused() {
        let mut shop = shop();
        let mut alice = shop.open_session().unwrap();
        let mut bob = shop.open_session().unwrap();
        shop.add_to_cart(&mut alice, &ItemId::new("a"), 2).unwrap();
        shop.add_to_cart(&mut bob, &ItemId::new("b"), 1).unwrap();

        let alice_paid = shop
            .begin_checkout(&alice)
            .unwrap()
            .authorize("tok_visa")
            .await;

        let err = shop.confirm_checkout(&mut bob, alice_paid.clone()).unwrap_err();
        assert!(matches!(err, CommerceError::StaleAttempt(_)));
        assert_eq!(bob.cart.item_count(), 1);
        assert!(shop.orders().list().unwrap().is_empty());

        shop.confirm_checkout(&mut alice, alice_paid).unwrap();
        assert!(alice.cart.is_empty());
        assert_eq!(bob.cart.item_count(), 1);
    }
}
