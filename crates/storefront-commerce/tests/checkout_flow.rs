//! End-to-end checkout behavior through the public API.

use std::sync::Arc;
use std::time::Duration;

use storefront_commerce::checkout::{PaymentConfirmation, PaymentOutcome};
use storefront_commerce::orders::{KvOrderStore, ORDER_INDEX_KEY};
use storefront_commerce::prelude::*;
use storefront_store::Store;

fn inr(major: i64) -> Money {
    Money::from_major(major, Currency::INR)
}

fn catalog() -> Arc<Catalog> {
    Arc::new(
        Catalog::new(vec![
            CatalogItem::new("a", "Arduino Uno R3", inr(100), "Microcontrollers", 10).unwrap(),
            CatalogItem::new("b", "DHT22 Sensor", inr(50), "Sensors", 10).unwrap(),
            CatalogItem::new("c", "Relay Module", inr(80), "Modules", 3).unwrap(),
        ])
        .unwrap(),
    )
}

fn shop_with(gateway: Arc<dyn PaymentGateway>, orders: OrderBook) -> Storefront {
    Storefront::new(ShopSettings::default(), catalog(), gateway, orders).unwrap()
}

fn shop() -> Storefront {
    shop_with(
        SimulatedGateway::new(Duration::ZERO).shared(),
        OrderBook::in_memory(),
    )
}

fn fill(shop: &Storefront, session: &mut ShopSession) {
    shop.add_to_cart(session, &ItemId::new("a"), 2).unwrap();
    shop.add_to_cart(session, &ItemId::new("b"), 1).unwrap();
}

fn stock(shop: &Storefront, id: &str) -> u32 {
    shop.catalog().stock_of(&ItemId::new(id)).unwrap()
}

#[test]
fn test_reference_cart_pricing() {
    let shop = shop();
    let mut session = shop.open_session().unwrap();
    fill(&shop, &mut session);

    let rounded = shop.quote(&session).unwrap().rounded().unwrap();
    assert_eq!(rounded.subtotal, inr(250));
    assert_eq!(rounded.tax, inr(45));
    assert_eq!(rounded.delivery, inr(50));
    assert_eq!(rounded.total, inr(345));

    shop.apply_discount(&mut session, "SAVE10").unwrap();
    let rounded = shop.quote(&session).unwrap().rounded().unwrap();
    assert_eq!(rounded.discount, inr(25));
    assert_eq!(rounded.tax, inr(45));
    assert_eq!(rounded.total, inr(320));
}

#[test]
fn test_pricing_is_deterministic() {
    let shop = shop();
    let mut session = shop.open_session().unwrap();
    fill(&shop, &mut session);
    assert_eq!(shop.quote(&session).unwrap(), shop.quote(&session).unwrap());
}

#[test]
fn test_stock_limit_on_repeated_add() {
    let shop = shop();
    let mut session = shop.open_session().unwrap();
    let relay = ItemId::new("c");

    shop.add_to_cart(&mut session, &relay, 2).unwrap();
    let err = shop.add_to_cart(&mut session, &relay, 2).unwrap_err();

    assert!(matches!(
        err,
        CommerceError::StockLimitExceeded {
            requested: 4,
            available: 3,
            ..
        }
    ));
    assert_eq!(session.cart.quantity_of(&relay), 2);
}

#[tokio::test]
async fn test_empty_cart_creates_no_order() {
    let mut shop = shop();
    let mut session = shop.open_session().unwrap();

    let err = shop.checkout(&mut session, "tok_visa").await.unwrap_err();
    assert!(matches!(err, CommerceError::EmptyCart));
    assert!(shop.orders().list().unwrap().is_empty());
}

#[tokio::test]
async fn test_successful_checkout_commits_everything() {
    let mut shop = shop();
    let mut session = shop.open_session().unwrap();
    fill(&shop, &mut session);

    let pending = shop.begin_checkout(&session).unwrap();
    let charged = pending.amount();
    let confirmation = pending.authorize("tok_visa").await;
    let receipt = shop.confirm_checkout(&mut session, confirmation).unwrap();

    assert_eq!(receipt.order.total, charged);
    assert_eq!(receipt.order.total, receipt.summary.total_money().unwrap());
    assert_eq!(receipt.order.status, OrderStatus::Processing);
    assert!(!receipt.order.needs_reconciliation);
    assert!(session.cart.is_empty());
    assert_eq!(stock(&shop, "a"), 8);
    assert_eq!(stock(&shop, "b"), 9);
    assert_eq!(stock(&shop, "c"), 3);

    let orders = shop.orders().list().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0], receipt.order);
}

#[tokio::test]
async fn test_declined_payment_changes_nothing() {
    let mut shop = shop();
    let mut session = shop.open_session().unwrap();
    fill(&shop, &mut session);
    let cart_before = session.cart.clone();

    let err = shop
        .checkout(&mut session, "tok_decline_insufficient_funds")
        .await
        .unwrap_err();

    assert!(matches!(err, CommerceError::PaymentFailed { .. }));
    assert_eq!(session.cart, cart_before);
    assert_eq!(stock(&shop, "a"), 10);
    assert!(shop.orders().list().unwrap().is_empty());
    assert!(matches!(shop.checkout_state(&session), CheckoutState::Failed { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_payment_changes_nothing_and_can_retry() {
    let mut shop = shop_with(
        SimulatedGateway::new(Duration::from_secs(120)).shared(),
        OrderBook::in_memory(),
    );
    let mut session = shop.open_session().unwrap();
    fill(&shop, &mut session);

    let err = shop.checkout(&mut session, "tok_visa").await.unwrap_err();
    assert!(matches!(err, CommerceError::Timeout(_)));
    assert!(err.is_retryable());
    assert_eq!(session.cart.item_count(), 3);
    assert_eq!(stock(&shop, "b"), 10);
    assert!(shop.orders().list().unwrap().is_empty());
}

#[tokio::test]
async fn test_superseded_attempt_is_discarded() {
    let mut shop = shop();
    let mut session = shop.open_session().unwrap();
    fill(&shop, &mut session);

    let first = shop.begin_checkout(&session).unwrap();
    let second = shop.begin_checkout(&session).unwrap();
    let first = first.authorize("tok_visa").await;
    let second = second.authorize("tok_visa").await;

    let err = shop.confirm_checkout(&mut session, first).unwrap_err();
    assert!(matches!(err, CommerceError::StaleAttempt(_)));
    assert_eq!(stock(&shop, "a"), 10);

    shop.confirm_checkout(&mut session, second).unwrap();
    assert_eq!(shop.orders().list().unwrap().len(), 1);
    assert_eq!(stock(&shop, "a"), 8);
}

#[tokio::test]
async fn test_forged_confirmation_is_stale() {
    let mut shop = shop();
    let mut session = shop.open_session().unwrap();
    fill(&shop, &mut session);
    let _pending = shop.begin_checkout(&session).unwrap();

    let forged = PaymentConfirmation {
        token: CheckoutToken::new("chk_forged"),
        outcome: PaymentOutcome::Succeeded {
            transaction_id: None,
        },
    };
    assert!(matches!(
        shop.confirm_checkout(&mut session, forged),
        Err(CommerceError::StaleAttempt(_))
    ));
    assert_eq!(shop.checkout_state(&session), CheckoutState::AwaitingPayment);
}

#[tokio::test]
async fn test_two_sessions_racing_for_last_stock() {
    let mut shop = shop();
    let mut first = shop.open_session().unwrap();
    let mut second = shop.open_session().unwrap();
    let relay = ItemId::new("c");
    shop.add_to_cart(&mut first, &relay, 2).unwrap();
    shop.add_to_cart(&mut second, &relay, 2).unwrap();

    // Both pass validation against the same 3 units before either pays.
    let first_pending = shop.begin_checkout(&first).unwrap();
    let second_pending = shop.begin_checkout(&second).unwrap();
    let first_paid = first_pending.authorize("tok_visa").await;
    let second_paid = second_pending.authorize("tok_visa").await;

    let first_receipt = shop.confirm_checkout(&mut first, first_paid).unwrap();
    let second_receipt = shop.confirm_checkout(&mut second, second_paid).unwrap();

    assert!(!first_receipt.order.needs_reconciliation);
    assert!(second_receipt.order.needs_reconciliation);
    assert_eq!(second_receipt.order.stock_shortfalls[0].available, 1);
    assert_eq!(stock(&shop, "c"), 1);
    assert!(first.cart.is_empty());
    assert!(second.cart.is_empty());

    let orders = shop.orders().list().unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(shop.orders().needing_reconciliation().unwrap().len(), 1);
}

#[tokio::test]
async fn test_one_session_does_not_supersede_another() {
    let mut shop = shop();
    let mut alice = shop.open_session().unwrap();
    let mut bob = shop.open_session().unwrap();
    fill(&shop, &mut alice);
    shop.add_to_cart(&mut bob, &ItemId::new("b"), 1).unwrap();

    let alice_pending = shop.begin_checkout(&alice).unwrap();
    let bob_pending = shop.begin_checkout(&bob).unwrap();
    assert_eq!(shop.checkout_state(&alice), CheckoutState::AwaitingPayment);

    let alice_paid = alice_pending.authorize("tok_visa").await;
    let receipt = shop.confirm_checkout(&mut alice, alice_paid).unwrap();
    assert_eq!(receipt.order.total, inr(345));
    assert!(alice.cart.is_empty());
    assert_eq!(bob.cart.item_count(), 1);

    let bob_paid = bob_pending.authorize("tok_visa").await;
    shop.confirm_checkout(&mut bob, bob_paid).unwrap();
    assert_eq!(shop.orders().list().unwrap().len(), 2);
    assert_eq!(stock(&shop, "b"), 8);
}

#[tokio::test]
async fn test_confirmation_cannot_cross_sessions() {
    let mut shop = shop();
    let mut alice = shop.open_session().unwrap();
    let mut bob = shop.open_session().unwrap();
    fill(&shop, &mut alice);
    shop.add_to_cart(&mut bob, &ItemId::new("c"), 1).unwrap();
    let _bob_pending = shop.begin_checkout(&bob).unwrap();

    let alice_paid = shop
        .begin_checkout(&alice)
        .unwrap()
        .authorize("tok_visa")
        .await;
    let err = shop.confirm_checkout(&mut bob, alice_paid).unwrap_err();

    assert!(matches!(err, CommerceError::StaleAttempt(_)));
    assert_eq!(bob.cart.item_count(), 1);
    assert_eq!(alice.cart.item_count(), 3);
    assert_eq!(stock(&shop, "a"), 10);
    assert!(shop.orders().list().unwrap().is_empty());
    assert_eq!(shop.checkout_state(&alice), CheckoutState::AwaitingPayment);
    assert_eq!(shop.checkout_state(&bob), CheckoutState::AwaitingPayment);
}

#[tokio::test]
async fn test_stock_lost_during_payment_flags_order() {
    let mut shop = shop();
    let mut session = shop.open_session().unwrap();
    shop.add_to_cart(&mut session, &ItemId::new("c"), 2).unwrap();

    let pending = shop.begin_checkout(&session).unwrap();
    shop.catalog().decrement_stock(&ItemId::new("c"), 3).unwrap();
    let confirmation = pending.authorize("tok_visa").await;
    let receipt = shop.confirm_checkout(&mut session, confirmation).unwrap();

    assert!(receipt.order.needs_reconciliation);
    assert_eq!(receipt.order.stock_shortfalls[0].available, 0);
    assert_eq!(shop.orders().needing_reconciliation().unwrap().len(), 1);
}

#[tokio::test]
async fn test_checkouts_through_two_store_handles_keep_both_orders() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    let mut placed = Vec::new();
    for _ in 0..2 {
        let store = Arc::new(Store::open(&path).unwrap());
        let mut shop = shop_with(
            SimulatedGateway::new(Duration::ZERO).shared(),
            OrderBook::new(Arc::new(KvOrderStore::new(store))),
        );
        let mut session = shop.open_session().unwrap();
        fill(&shop, &mut session);
        let pending = shop.begin_checkout(&session).unwrap();
        placed.push((shop, session, pending));
    }

    let mut ids = Vec::new();
    for (mut shop, mut session, pending) in placed {
        let confirmation = pending.authorize("tok_visa").await;
        ids.push(shop.confirm_checkout(&mut session, confirmation).unwrap().order.id);
    }

    let book = OrderBook::new(Arc::new(KvOrderStore::new(Arc::new(
        Store::open(&path).unwrap(),
    ))));
    let listed: Vec<_> = book.list().unwrap().into_iter().map(|o| o.id).collect();
    assert_eq!(listed, ids);
    for id in &ids {
        assert!(book.get(id).is_ok());
    }
}

#[tokio::test]
async fn test_orders_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orders.json");

    let order_id = {
        let store = Arc::new(Store::open(&path).unwrap());
        let mut shop = shop_with(
            SimulatedGateway::new(Duration::ZERO).shared(),
            OrderBook::new(Arc::new(KvOrderStore::new(store))),
        );
        let mut session = shop.open_session().unwrap();
        fill(&shop, &mut session);
        shop.checkout(&mut session, "tok_visa").await.unwrap().order.id
    };

    let store = Arc::new(Store::open(&path).unwrap());
    assert!(store.exists(ORDER_INDEX_KEY).unwrap());
    let book = OrderBook::new(Arc::new(KvOrderStore::new(store)));

    let order = book.get(&order_id).unwrap();
    assert_eq!(order.total, inr(345));

    let shipped = book
        .update_status(&order_id, OrderStatus::Shipped, Some("BLUEDART 5512".into()))
        .unwrap();
    assert_eq!(shipped.tracking_reference.as_deref(), Some("BLUEDART 5512"));
    assert_eq!(book.list().unwrap()[0].status, OrderStatus::Shipped);
}
