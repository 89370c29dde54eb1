//! Client-side shopping cart.
//!
//! [`CartStore`] owns the line-item list and keeps it durable: every mutation
//! writes the full snapshot to storage before returning, so a reload right
//! after any call observes the post-mutation state. If the write fails the
//! in-memory cart stays authoritative and the error is handed back to the
//! caller.
//!
//! Rendering is push-based. Each mutation publishes a fresh [`CartView`] on a
//! `watch` channel; badge counters and the drawer subscribe to it.

mod view;

pub use view::{CartCountTemplate, CartDrawerTemplate, CartItemView, CartView};

use dry_core::{CurrencyCode, Product, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use crate::storage::{KeyValueStore, StorageError};

/// Storage key holding the serialized cart.
pub const CART_STORAGE_KEY: &str = "dry_cart";

/// Cart persistence failed. The in-memory cart is still valid.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("cart storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("cart serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One product-quantity pair in the cart.
///
/// Field names match the stored JSON layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineItem {
    pub id: ProductId,
    pub name: String,
    /// Unit price at the time the product was added.
    pub price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
    pub quantity: u32,
}

impl CartLineItem {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// The product fields the cart copies into a new line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartProduct {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub image_url: Option<String>,
}

/// Lines are priced at the product's list price.
impl From<&Product> for CartProduct {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: product.price,
            image_url: product.image_url.clone(),
        }
    }
}

/// Derived cart totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CartTotals {
    /// Sum of quantities.
    pub item_count: u32,
    /// Sum of unit price times quantity.
    pub subtotal: Decimal,
}

/// A frozen copy of the cart's line items.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartSnapshot(Vec<CartLineItem>);

impl CartSnapshot {
    #[must_use]
    pub fn items(&self) -> &[CartLineItem] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn totals(&self) -> CartTotals {
        totals_of(&self.0)
    }

    #[must_use]
    pub fn into_items(self) -> Vec<CartLineItem> {
        self.0
    }
}

fn totals_of(items: &[CartLineItem]) -> CartTotals {
    items.iter().fold(CartTotals::default(), |acc, item| CartTotals {
        item_count: acc.item_count.saturating_add(item.quantity),
        subtotal: acc.subtotal + item.line_total(),
    })
}

/// The shopper's cart, persisted to a [`KeyValueStore`].
pub struct CartStore<S> {
    storage: S,
    items: Vec<CartLineItem>,
    drawer_open: bool,
    currency: CurrencyCode,
    view_tx: watch::Sender<CartView>,
}

impl<S: KeyValueStore> CartStore<S> {
    /// Load the cart from storage.
    ///
    /// Never fails: a missing record yields an empty cart, and an unreadable
    /// or corrupt record is logged and treated as empty.
    #[instrument(skip(storage))]
    pub fn load(storage: S, currency: CurrencyCode) -> Self {
        let items = match storage.get(CART_STORAGE_KEY) {
            Ok(Some(bytes)) => match serde_json::from_slice::<Vec<CartLineItem>>(&bytes) {
                Ok(items) => sanitize(items),
                Err(e) => {
                    warn!(error = %e, "Stored cart is corrupt, starting empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read stored cart, starting empty");
                Vec::new()
            }
        };

        debug!(lines = items.len(), "Cart loaded");

        let initial = CartView::project(&items, false, currency);
        let (view_tx, _) = watch::channel(initial);

        Self {
            storage,
            items,
            drawer_open: false,
            currency,
            view_tx,
        }
    }

    /// Add one unit of `product`, then open the drawer.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError` if the snapshot could not be written. The
    /// item is in the cart regardless.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub fn add_item(&mut self, product: CartProduct) -> Result<(), PersistenceError> {
        if let Some(line) = self.items.iter_mut().find(|line| line.id == product.id) {
            line.quantity = line.quantity.saturating_add(1);
        } else {
            self.items.push(CartLineItem {
                id: product.id,
                name: product.name,
                price: product.price,
                image_url: product.image_url,
                quantity: 1,
            });
        }
        self.drawer_open = true;
        self.commit()
    }

    /// Delete the line for `id`. Absent ids are a no-op.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError` if the snapshot could not be written.
    #[instrument(skip(self))]
    pub fn remove_item(&mut self, id: ProductId) -> Result<(), PersistenceError> {
        let before = self.items.len();
        self.items.retain(|line| line.id != id);
        if self.items.len() == before {
            debug!("Remove of product not in cart ignored");
            return Ok(());
        }
        self.commit()
    }

    /// Adjust the quantity for `id` by `delta`. Dropping to zero or below
    /// removes the line. Absent ids are a no-op.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError` if the snapshot could not be written.
    #[instrument(skip(self))]
    pub fn change_quantity(&mut self, id: ProductId, delta: i64) -> Result<(), PersistenceError> {
        let Some(line) = self.items.iter_mut().find(|line| line.id == id) else {
            debug!("Quantity change for product not in cart ignored");
            return Ok(());
        };

        let next = i64::from(line.quantity).saturating_add(delta);
        if next <= 0 {
            return self.remove_item(id);
        }
        line.quantity = u32::try_from(next).unwrap_or(u32::MAX);
        self.commit()
    }

    /// Empty the cart and delete the durable record.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError` if the record could not be removed.
    #[instrument(skip(self))]
    pub fn clear(&mut self) -> Result<(), PersistenceError> {
        self.items.clear();
        self.publish();
        self.storage.remove(CART_STORAGE_KEY)?;
        Ok(())
    }

    /// Reveal the drawer. Does not touch storage.
    pub fn open_drawer(&mut self) {
        self.drawer_open = true;
        self.publish();
    }

    /// Hide the drawer. Does not touch storage.
    pub fn close_drawer(&mut self) {
        self.drawer_open = false;
        self.publish();
    }

    /// Item count and subtotal, computed on demand.
    #[must_use]
    pub fn totals(&self) -> CartTotals {
        totals_of(&self.items)
    }

    #[must_use]
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub const fn is_drawer_open(&self) -> bool {
        self.drawer_open
    }

    #[must_use]
    pub const fn currency(&self) -> CurrencyCode {
        self.currency
    }

    /// Frozen copy of the current line items.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot(self.items.clone())
    }

    /// Project the current state into a view.
    #[must_use]
    pub fn render(&self) -> CartView {
        CartView::project(&self.items, self.drawer_open, self.currency)
    }

    /// Subscribe to rendered views. The receiver starts at the current view.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartView> {
        self.view_tx.subscribe()
    }

    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    #[must_use]
    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Publish the new view, then write the snapshot.
    fn commit(&mut self) -> Result<(), PersistenceError> {
        self.publish();
        let bytes = serde_json::to_vec(&self.items)?;
        self.storage.set(CART_STORAGE_KEY, &bytes)?;
        Ok(())
    }

    fn publish(&self) {
        self.view_tx.send_replace(self.render());
    }
}

/// Restore the one-line-per-product and quantity >= 1 rules on loaded data.
fn sanitize(items: Vec<CartLineItem>) -> Vec<CartLineItem> {
    let mut clean: Vec<CartLineItem> = Vec::with_capacity(items.len());
    for item in items {
        if item.quantity == 0 {
            continue;
        }
        if let Some(existing) = clean.iter_mut().find(|line| line.id == item.id) {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        } else {
            clean.push(item);
        }
    }
    clean
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn deck() -> CartProduct {
        CartProduct {
            id: ProductId::new(1),
            name: "Deck".to_string(),
            price: Decimal::new(100, 0),
            image_url: None,
        }
    }

    fn wheels() -> CartProduct {
        CartProduct {
            id: ProductId::new(2),
            name: "Wheels".to_string(),
            price: Decimal::new(4550, 2),
            image_url: Some("https://cdn.example/wheels.png".to_string()),
        }
    }

    fn empty_cart() -> CartStore<MemoryStore> {
        CartStore::load(MemoryStore::new(), CurrencyCode::AED)
    }

    fn reload(cart: CartStore<MemoryStore>) -> CartStore<MemoryStore> {
        CartStore::load(cart.into_storage(), CurrencyCode::AED)
    }

    #[test]
    fn test_add_twice_increments_single_line() {
        let mut cart = empty_cart();
        cart.add_item(deck()).unwrap();
        cart.add_item(deck()).unwrap();

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 2);
        assert_eq!(
            cart.totals(),
            CartTotals {
                item_count: 2,
                subtotal: Decimal::new(200, 0)
            }
        );
    }

    #[test]
    fn test_add_opens_drawer() {
        let mut cart = empty_cart();
        assert!(!cart.is_drawer_open());
        cart.add_item(deck()).unwrap();
        assert!(cart.is_drawer_open());
        cart.close_drawer();
        assert!(!cart.render().drawer_open);
    }

    #[test]
    fn test_change_quantity_to_zero_removes_and_persists_empty() {
        let mut cart = empty_cart();
        cart.add_item(deck()).unwrap();
        cart.add_item(deck()).unwrap();
        cart.change_quantity(ProductId::new(1), -2).unwrap();

        assert!(cart.is_empty());
        let stored = cart.storage().get(CART_STORAGE_KEY).unwrap().unwrap();
        assert_eq!(stored, b"[]");
        assert!(reload(cart).is_empty());
    }

    #[test]
    fn test_change_quantity_below_zero_removes() {
        let mut cart = empty_cart();
        cart.add_item(deck()).unwrap();
        cart.change_quantity(ProductId::new(1), -5).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_missing_ids_are_noops() {
        let mut cart = empty_cart();
        cart.add_item(deck()).unwrap();
        cart.remove_item(ProductId::new(99)).unwrap();
        cart.change_quantity(ProductId::new(99), 3).unwrap();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 1);
    }

    #[test]
    fn test_reload_observes_every_mutation() {
        let mut cart = empty_cart();
        cart.add_item(deck()).unwrap();
        cart.add_item(wheels()).unwrap();
        cart.change_quantity(ProductId::new(2), 2).unwrap();
        let before = cart.snapshot();

        let cart = reload(cart);
        assert_eq!(cart.snapshot(), before);
        assert_eq!(cart.items()[1].quantity, 3);
    }

    #[test]
    fn test_clear_then_load_is_empty() {
        let mut cart = empty_cart();
        cart.add_item(deck()).unwrap();
        cart.clear().unwrap();

        assert!(cart.is_empty());
        assert_eq!(cart.storage().get(CART_STORAGE_KEY).unwrap(), None);
        assert!(reload(cart).is_empty());
    }

    #[test]
    fn test_corrupt_storage_loads_empty() {
        let mut storage = MemoryStore::new();
        storage.set(CART_STORAGE_KEY, b"{not json").unwrap();
        let cart = CartStore::load(storage, CurrencyCode::AED);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_load_repairs_duplicate_and_zero_lines() {
        let mut storage = MemoryStore::new();
        let raw = serde_json::json!([
            { "id": 1, "name": "Deck", "price": 100, "image_url": null, "quantity": 1 },
            { "id": 2, "name": "Wheels", "price": "45.50", "quantity": 0 },
            { "id": 1, "name": "Deck", "price": 100, "quantity": 2 }
        ]);
        storage
            .set(CART_STORAGE_KEY, raw.to_string().as_bytes())
            .unwrap();

        let cart = CartStore::load(storage, CurrencyCode::AED);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 3);
    }

    #[test]
    fn test_write_failure_is_reported_but_memory_kept() {
        let mut cart = CartStore::load(MemoryStore::with_quota(8), CurrencyCode::AED);
        let err = cart.add_item(deck()).unwrap_err();

        assert!(matches!(
            err,
            PersistenceError::Storage(StorageError::QuotaExceeded { .. })
        ));
        assert_eq!(cart.totals().item_count, 1);
        assert_eq!(cart.render().item_count, 1);
    }

    #[test]
    fn test_subscribers_see_each_mutation() {
        let mut cart = empty_cart();
        let rx = cart.subscribe();
        assert_eq!(rx.borrow().item_count, 0);

        cart.add_item(deck()).unwrap();
        assert_eq!(rx.borrow().item_count, 1);
        assert!(rx.borrow().drawer_open);

        cart.remove_item(ProductId::new(1)).unwrap();
        assert_eq!(rx.borrow().item_count, 0);
    }

    #[test]
    fn test_cart_product_uses_list_price() {
        let product: Product = serde_json::from_value(serde_json::json!({
            "id": 3, "name": "Griptape", "price": 40, "sale_price": 30, "stock": 50
        }))
        .unwrap();
        assert_eq!(CartProduct::from(&product).price, Decimal::new(40, 0));
    }
}
