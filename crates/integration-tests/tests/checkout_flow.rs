//! Order placement against a persisted cart.

#![allow(clippy::unwrap_used)]

use dry_core::{CurrencyCode, OrderId, OrderStatus};
use dry_integration_tests::{RecordingSink, product};
use dry_storefront::cart::{CART_STORAGE_KEY, CartProduct, CartStore};
use dry_storefront::checkout::{CheckoutError, CheckoutForm, place_order};
use dry_storefront::storage::{FileStore, KeyValueStore, StorageError};
use rust_decimal::Decimal;

fn valid_form() -> CheckoutForm {
    CheckoutForm {
        fname: "Rad".to_string(),
        lname: "Rider".to_string(),
        email: "rider@example.com".to_string(),
        address: "1 Ramp Road".to_string(),
        city: "Dubai".to_string(),
        state: "Dubai".to_string(),
        zip: "00000".to_string(),
        card_number: "4242 4242 4242 4242".to_string(),
        card_expiry: "12/30".to_string(),
        card_cvc: "123".to_string(),
    }
}

fn filled_cart(dir: &std::path::Path) -> CartStore<FileStore> {
    let mut cart = CartStore::load(FileStore::new(dir), CurrencyCode::AED);
    let mut pintail = product(2, "Pintail 42", 600);
    pintail.sale_price = Some(Decimal::from(480));
    cart.add_item(CartProduct::from(&product(1, "Neon Cruiser", 450)))
        .unwrap();
    cart.add_item(CartProduct::from(&pintail)).unwrap();
    cart.add_item(CartProduct::from(&pintail)).unwrap();
    cart
}

#[tokio::test]
async fn successful_order_clears_the_stored_cart() {
    let dir = tempfile::tempdir().unwrap();
    let mut cart = filled_cart(dir.path());
    let sink = RecordingSink::default();

    let placed = place_order(&mut cart, &sink, &valid_form()).await.unwrap();

    assert_eq!(placed.id, OrderId::new(1));
    assert_eq!(placed.item_count, 3);
    // Sale prices are shown on the card but orders charge the list price.
    assert_eq!(placed.total, Decimal::from(450 + 2 * 600));
    assert!(cart.is_empty());

    let orders = sink.orders();
    assert_eq!(orders.len(), 1);
    let order = orders.first().unwrap();
    assert_eq!(order.user_email, "rider@example.com");
    assert_eq!(order.status, OrderStatus::Paid);
    assert_eq!(order.items.len(), 2);

    let reopened = CartStore::load(FileStore::new(dir.path()), CurrencyCode::AED);
    assert!(reopened.is_empty());
}

/// File store that cannot delete.
struct UndeletableStore(FileStore);

impl KeyValueStore for UndeletableStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.0.get(key)
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.0.set(key, value)
    }

    fn remove(&mut self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Io(std::io::Error::from(
            std::io::ErrorKind::PermissionDenied,
        )))
    }
}

#[tokio::test]
async fn order_with_undeletable_cart_reports_the_order_id() {
    let dir = tempfile::tempdir().unwrap();
    drop(filled_cart(dir.path()));
    let mut cart = CartStore::load(UndeletableStore(FileStore::new(dir.path())), CurrencyCode::AED);
    let sink = RecordingSink::default();

    let err = place_order(&mut cart, &sink, &valid_form()).await.unwrap_err();

    let CheckoutError::CartNotCleared { order, .. } = &err else {
        panic!("unexpected error: {err:?}");
    };
    assert_eq!(order.id, OrderId::new(1));
    assert_eq!(order.item_count, 3);
    assert!(err.to_string().contains("#1"));
    assert_eq!(sink.orders().len(), 1);

    // The stale record is still on disk, so the caller must retry the clear.
    assert!(FileStore::new(dir.path()).get(CART_STORAGE_KEY).unwrap().is_some());
}

#[tokio::test]
async fn rejected_order_leaves_cart_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let mut cart = filled_cart(dir.path());
    let before = cart.snapshot();

    let err = place_order(&mut cart, &RecordingSink::rejecting(), &valid_form())
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::Order(_)));
    assert!(!err.is_validation());
    assert_eq!(cart.snapshot(), before);

    let reopened = CartStore::load(FileStore::new(dir.path()), CurrencyCode::AED);
    assert_eq!(reopened.snapshot(), before);
}

#[tokio::test]
async fn invalid_form_never_reaches_the_sink() {
    let dir = tempfile::tempdir().unwrap();
    let mut cart = filled_cart(dir.path());
    let sink = RecordingSink::default();
    let form = CheckoutForm {
        card_expiry: "1230".to_string(),
        ..valid_form()
    };

    let err = place_order(&mut cart, &sink, &form).await.unwrap_err();

    assert!(matches!(err, CheckoutError::InvalidExpiry));
    assert!(sink.orders().is_empty());
    assert!(!cart.is_empty());
}

#[tokio::test]
async fn empty_cart_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut cart = CartStore::load(FileStore::new(dir.path()), CurrencyCode::AED);
    let sink = RecordingSink::default();

    let err = place_order(&mut cart, &sink, &valid_form())
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::EmptyCart));
    assert!(sink.orders().is_empty());
}
