//! Checkout: form validation, order submission, order summary.
//!
//! Payment is simulated. A form that passes validation is treated as paid,
//! the order row is written to the backend, and the cart is cleared. If the
//! backend rejects the order the cart is left exactly as it was.

use std::future::Future;
use std::sync::LazyLock;

use askama::Template;
use askama_web::WebTemplate;
use dry_core::{CurrencyCode, Email, EmailError, OrderId, OrderStatus, Price};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::cart::{CartLineItem, CartSnapshot, CartStore, PersistenceError};
use crate::storage::KeyValueStore;
use crate::supabase::SupabaseError;

/// Flat shipping charge.
pub const SHIPPING_COST: Decimal = Decimal::ZERO;

/// Minimum card number length, whitespace excluded.
const MIN_CARD_DIGITS: usize = 13;

/// Minimum CVC length.
const MIN_CVC_LEN: usize = 3;

const SUMMARY_PLACEHOLDER_IMAGE: &str = "https://placehold.co/60";

static EXPIRY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}\s?/\s?\d{2}$").expect("Invalid regex"));

/// Reasons an order was not placed.
///
/// The display strings are shown to the shopper.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Your cart is empty.")]
    EmptyCart,

    #[error("Please fill in all shipping details.")]
    MissingShipping,

    #[error("Please fill in all payment details.")]
    MissingPayment,

    #[error("Please enter a valid email address.")]
    InvalidEmail(#[source] EmailError),

    #[error("Please enter a valid card number.")]
    InvalidCardNumber,

    #[error("Please enter expiry in MM/YY format.")]
    InvalidExpiry,

    #[error("Please enter a valid CVC.")]
    InvalidCvc,

    #[error("Failed to place order. {0}")]
    Order(#[from] SupabaseError),

    /// The order went through but the stored cart still holds its lines.
    #[error("Order #{} was placed, but your cart could not be emptied.", order.id)]
    CartNotCleared {
        order: PlacedOrder,
        #[source]
        source: PersistenceError,
    },
}

impl CheckoutError {
    /// Whether the shopper can fix this by editing the form.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        !matches!(self, Self::Order(_) | Self::CartNotCleared { .. })
    }
}

/// The checkout form as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutForm {
    #[serde(default)]
    pub fname: String,
    #[serde(default)]
    pub lname: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip: String,
    #[serde(default)]
    pub card_number: String,
    #[serde(default)]
    pub card_expiry: String,
    #[serde(default)]
    pub card_cvc: String,
}

impl CheckoutForm {
    /// Check the form, returning the customer's email on success.
    ///
    /// Checks run in order: shipping fields, payment fields, email, card
    /// number, expiry, CVC. The first failure wins.
    ///
    /// # Errors
    ///
    /// Returns the first `CheckoutError` validation variant that applies.
    pub fn validate(&self) -> Result<Email, CheckoutError> {
        let shipping = [
            &self.fname,
            &self.lname,
            &self.email,
            &self.address,
            &self.city,
            &self.state,
            &self.zip,
        ];
        if shipping.iter().any(|field| field.trim().is_empty()) {
            return Err(CheckoutError::MissingShipping);
        }

        let payment = [&self.card_number, &self.card_expiry, &self.card_cvc];
        if payment.iter().any(|field| field.trim().is_empty()) {
            return Err(CheckoutError::MissingPayment);
        }

        let email: Email = self.email.parse().map_err(CheckoutError::InvalidEmail)?;

        let digits = self
            .card_number
            .chars()
            .filter(|c| !c.is_whitespace())
            .count();
        if digits < MIN_CARD_DIGITS {
            return Err(CheckoutError::InvalidCardNumber);
        }

        if !EXPIRY_PATTERN.is_match(&self.card_expiry) {
            return Err(CheckoutError::InvalidExpiry);
        }

        if self.card_cvc.chars().count() < MIN_CVC_LEN {
            return Err(CheckoutError::InvalidCvc);
        }

        Ok(email)
    }
}

/// Order row written to the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderPayload {
    pub user_email: String,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub items: Vec<CartLineItem>,
}

impl OrderPayload {
    /// A paid order for everything in `snapshot`.
    #[must_use]
    pub fn paid(email: &Email, snapshot: CartSnapshot) -> Self {
        let total_amount = snapshot.totals().subtotal + SHIPPING_COST;
        Self {
            user_email: email.as_str().to_string(),
            total_amount,
            status: OrderStatus::Paid,
            items: snapshot.into_items(),
        }
    }
}

/// Where placed orders go.
pub trait OrderSink: Send + Sync {
    /// Store `order` and return its id.
    ///
    /// # Errors
    ///
    /// Returns `SupabaseError` if the order was not stored.
    fn create_order(
        &self,
        order: &OrderPayload,
    ) -> impl Future<Output = Result<OrderId, SupabaseError>> + Send;
}

/// A successfully placed order.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedOrder {
    pub id: OrderId,
    pub total: Decimal,
    pub item_count: u32,
}

/// Validate `form`, submit the cart as an order, and clear the cart.
///
/// The cart is read as a frozen snapshot before submission. It is cleared
/// only after the sink accepts the order.
///
/// # Errors
///
/// Returns `CheckoutError` if the cart is empty, the form is invalid, or the
/// sink rejects the order; the cart is untouched in those cases. If the order
/// was stored but the cart record could not be deleted, returns
/// `CheckoutError::CartNotCleared` carrying the placed order.
#[instrument(skip_all)]
pub async fn place_order<S, O>(
    cart: &mut CartStore<S>,
    sink: &O,
    form: &CheckoutForm,
) -> Result<PlacedOrder, CheckoutError>
where
    S: KeyValueStore,
    O: OrderSink,
{
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    let email = form.validate()?;

    let snapshot = cart.snapshot();
    let item_count = snapshot.totals().item_count;
    let payload = OrderPayload::paid(&email, snapshot);
    let total = payload.total_amount;

    let id = sink.create_order(&payload).await.inspect_err(|e| {
        warn!(error = %e, "Order submission failed");
    })?;

    let placed = PlacedOrder {
        id,
        total,
        item_count,
    };
    if let Err(source) = cart.clear() {
        warn!(order_id = %id, error = %source, "Order placed but stored cart could not be cleared");
        return Err(CheckoutError::CartNotCleared {
            order: placed,
            source,
        });
    }

    info!(order_id = %id, %total, item_count, "Order placed");
    Ok(placed)
}

/// One line of the order summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLineView {
    pub name: String,
    pub image_url: String,
    pub quantity: u32,
    pub line_price: String,
}

/// Order summary display data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSummaryView {
    pub lines: Vec<OrderLineView>,
    pub subtotal: String,
    pub shipping: String,
    pub total: String,
}

impl OrderSummaryView {
    #[must_use]
    pub fn new(snapshot: &CartSnapshot, currency: CurrencyCode) -> Self {
        let subtotal = snapshot.totals().subtotal;
        Self {
            lines: snapshot
                .items()
                .iter()
                .map(|line| OrderLineView {
                    name: line.name.clone(),
                    image_url: line
                        .image_url
                        .clone()
                        .filter(|url| !url.is_empty())
                        .unwrap_or_else(|| SUMMARY_PLACEHOLDER_IMAGE.to_string()),
                    quantity: line.quantity,
                    line_price: Price::new(line.line_total(), currency).to_string(),
                })
                .collect(),
            subtotal: Price::new(subtotal, currency).to_string(),
            shipping: Price::new(SHIPPING_COST, currency).to_string(),
            total: Price::new(subtotal + SHIPPING_COST, currency).to_string(),
        }
    }
}

/// Order summary fragment.
#[derive(Template, WebTemplate)]
#[template(path = "partials/order_summary.html")]
pub struct OrderSummaryTemplate {
    pub summary: OrderSummaryView,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use dry_core::ProductId;

    use super::*;
    use crate::cart::{CART_STORAGE_KEY, CartProduct};
    use crate::storage::{MemoryStore, StorageError};

    /// Memory store whose first `failed_removes` deletions fail.
    struct StickyStore {
        inner: MemoryStore,
        failed_removes: usize,
    }

    impl KeyValueStore for StickyStore {
        fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError> {
            self.inner.set(key, value)
        }

        fn remove(&mut self, key: &str) -> Result<(), StorageError> {
            if self.failed_removes > 0 {
                self.failed_removes -= 1;
                return Err(StorageError::Io(std::io::Error::other("disk detached")));
            }
            self.inner.remove(key)
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        orders: Mutex<Vec<OrderPayload>>,
        fail: bool,
    }

    impl OrderSink for RecordingSink {
        async fn create_order(&self, order: &OrderPayload) -> Result<OrderId, SupabaseError> {
            if self.fail {
                return Err(SupabaseError::Api {
                    status: 400,
                    message: "new row violates row-level security policy".to_string(),
                });
            }
            let mut orders = self.orders.lock().unwrap();
            orders.push(order.clone());
            Ok(OrderId::new(i64::try_from(orders.len()).unwrap() + 100))
        }
    }

    fn form() -> CheckoutForm {
        CheckoutForm {
            fname: "Tony".to_string(),
            lname: "Hawk".to_string(),
            email: "tony@example.com".to_string(),
            address: "1 Ramp Rd".to_string(),
            city: "Dubai".to_string(),
            state: "Dubai".to_string(),
            zip: "00000".to_string(),
            card_number: "4242 4242 4242 4242".to_string(),
            card_expiry: "12 / 29".to_string(),
            card_cvc: "123".to_string(),
        }
    }

    fn cart_with_deck() -> CartStore<MemoryStore> {
        let mut cart = CartStore::load(MemoryStore::new(), CurrencyCode::AED);
        let deck = CartProduct {
            id: ProductId::new(1),
            name: "Deck".to_string(),
            price: Decimal::new(100, 0),
            image_url: None,
        };
        cart.add_item(deck.clone()).unwrap();
        cart.add_item(deck).unwrap();
        cart
    }

    #[test]
    fn test_valid_form() {
        assert_eq!(form().validate().unwrap().as_str(), "tony@example.com");
    }

    #[test]
    fn test_validation_order() {
        let mut f = form();
        f.zip = "  ".to_string();
        f.card_cvc = String::new();
        assert!(matches!(f.validate(), Err(CheckoutError::MissingShipping)));

        let mut f = form();
        f.card_cvc = String::new();
        assert!(matches!(f.validate(), Err(CheckoutError::MissingPayment)));

        let mut f = form();
        f.email = "not-an-email".to_string();
        assert!(matches!(f.validate(), Err(CheckoutError::InvalidEmail(_))));
    }

    #[test]
    fn test_card_checks() {
        let mut f = form();
        f.card_number = "4242 4242 424".to_string();
        assert!(matches!(f.validate(), Err(CheckoutError::InvalidCardNumber)));

        let mut f = form();
        f.card_expiry = "1229".to_string();
        assert!(matches!(f.validate(), Err(CheckoutError::InvalidExpiry)));
        f.card_expiry = "12/29".to_string();
        assert!(f.validate().is_ok());

        let mut f = form();
        f.card_cvc = "12".to_string();
        assert!(matches!(f.validate(), Err(CheckoutError::InvalidCvc)));
    }

    #[tokio::test]
    async fn test_place_order_submits_and_clears() {
        let mut cart = cart_with_deck();
        let sink = RecordingSink::default();

        let placed = place_order(&mut cart, &sink, &form()).await.unwrap();
        assert_eq!(placed.id, OrderId::new(101));
        assert_eq!(placed.total, Decimal::new(200, 0));
        assert_eq!(placed.item_count, 2);
        assert!(cart.is_empty());

        let orders = sink.orders.lock().unwrap();
        assert_eq!(orders[0].status, OrderStatus::Paid);
        assert_eq!(orders[0].items[0].quantity, 2);
        assert_eq!(orders[0].user_email, "tony@example.com");
    }

    #[tokio::test]
    async fn test_failed_submission_keeps_cart() {
        let mut cart = cart_with_deck();
        let sink = RecordingSink {
            fail: true,
            ..RecordingSink::default()
        };

        let err = place_order(&mut cart, &sink, &form()).await.unwrap_err();
        assert!(!err.is_validation());
        assert!(err.to_string().starts_with("Failed to place order."));
        assert_eq!(cart.totals().item_count, 2);
    }

    #[tokio::test]
    async fn test_failed_clear_reports_placed_order() {
        let store = StickyStore {
            inner: MemoryStore::new(),
            failed_removes: 1,
        };
        let mut cart = CartStore::load(store, CurrencyCode::AED);
        cart.add_item(CartProduct {
            id: ProductId::new(1),
            name: "Deck".to_string(),
            price: Decimal::new(100, 0),
            image_url: None,
        })
        .unwrap();
        let sink = RecordingSink::default();

        let err = place_order(&mut cart, &sink, &form()).await.unwrap_err();
        let CheckoutError::CartNotCleared { order, .. } = &err else {
            panic!("unexpected error: {err:?}");
        };
        assert_eq!(order.id, OrderId::new(101));
        assert_eq!(order.total, Decimal::new(100, 0));
        assert!(!err.is_validation());
        assert!(err.to_string().starts_with("Order #101 was placed"));
        assert_eq!(sink.orders.lock().unwrap().len(), 1);
        assert!(cart.storage().get(CART_STORAGE_KEY).unwrap().is_some());

        // Retrying the clear deletes the stale record.
        cart.clear().unwrap();
        let reloaded = CartStore::load(cart.into_storage(), CurrencyCode::AED);
        assert!(reloaded.is_empty());
    }

    #[tokio::test]
    async fn test_empty_cart_rejected() {
        let mut cart = CartStore::load(MemoryStore::new(), CurrencyCode::AED);
        let err = place_order(&mut cart, &RecordingSink::default(), &form())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));
    }

    #[test]
    fn test_payload_serializes_paid_status() {
        let cart = cart_with_deck();
        let email: Email = "tony@example.com".parse().unwrap();
        let json = serde_json::to_value(OrderPayload::paid(&email, cart.snapshot())).unwrap();
        assert_eq!(json["status"], "paid");
        assert_eq!(json["items"][0]["id"], 1);
    }

    #[test]
    fn test_summary_view() {
        let cart = cart_with_deck();
        let summary = OrderSummaryView::new(&cart.snapshot(), CurrencyCode::AED);
        assert_eq!(summary.lines[0].line_price, "AED 200.00");
        assert_eq!(summary.shipping, "AED 0.00");
        assert_eq!(summary.total, "AED 200.00");
        assert_eq!(summary.lines[0].image_url, SUMMARY_PLACEHOLDER_IMAGE);

        let html = OrderSummaryTemplate { summary }.render().unwrap();
        assert!(html.contains("Deck"));
    }
}
