//! Integration tests for the DRY Skateboards storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p dry-integration-tests
//! ```
//!
//! Nothing here touches the network: products come from [`FakeSource`],
//! orders go to [`RecordingSink`], and change events are pushed straight
//! into a [`WebhookFeed`].
//!
//! # Test Categories
//!
//! - `cart_properties` - cart invariants over arbitrary operation sequences
//! - `catalog_sync` - load, change feed and view re-rendering
//! - `checkout_flow` - order placement against the cart
//! - `storefront_routes` - the HTTP surface via `tower::ServiceExt::oneshot`

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::future::Future;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use dry_core::{CurrencyCode, OrderId, Product, ProductId, StockStatus};
use dry_storefront::cart::CartStore;
use dry_storefront::catalog::{CatalogHandle, CatalogOptions, PRODUCTS_TABLE, ProductSource};
use dry_storefront::checkout::{OrderPayload, OrderSink};
use dry_storefront::config::{CatalogConfig, StorefrontConfig, SupabaseConfig};
use dry_storefront::feed::WebhookFeed;
use dry_storefront::state::AppState;
use dry_storefront::storage::FileStore;
use dry_storefront::supabase::{SupabaseClient, SupabaseError};
use rust_decimal::Decimal;
use secrecy::SecretString;
use tempfile::TempDir;
use url::Url;

/// Webhook secret the test app expects.
pub const WEBHOOK_SECRET: &str = "k7Qz-4vNp2Lx9RwT8mYc3HbJ6sFd1GaE";

/// An in-stock product with no sale, rating or feature flag.
#[must_use]
pub fn product(id: i64, name: &str, price: i64) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_string(),
        description: None,
        price: Decimal::from(price),
        sale_price: None,
        stock: 20,
        category: "boards".to_string(),
        image_url: None,
        rating: None,
        stock_status: StockStatus::InStock,
        is_featured: false,
    }
}

/// A small catalog covering the card states the storefront distinguishes.
#[must_use]
pub fn sample_catalog() -> Vec<Product> {
    let mut cruiser = product(1, "Neon Cruiser", 450);
    cruiser.is_featured = true;

    let mut pintail = product(2, "Pintail 42", 600);
    pintail.sale_price = Some(Decimal::from(480));

    let mut sold_out = product(3, "Ghost Deck", 300);
    sold_out.stock = 0;
    sold_out.stock_status = StockStatus::SoldOut;

    let mut soon = product(4, "Prototype X", 900);
    soon.stock_status = StockStatus::ComingSoon;

    let mut tee = product(5, "DRY Logo Tee", 120);
    tee.category = "apparel".to_string();

    vec![cruiser, pintail, sold_out, soon, tee]
}

/// Product source serving whatever was last set; `None` fails the fetch.
#[derive(Clone, Default)]
pub struct FakeSource {
    response: Arc<Mutex<Option<Vec<Product>>>>,
    fetches: Arc<Mutex<usize>>,
}

impl FakeSource {
    #[must_use]
    pub fn serving(products: Vec<Product>) -> Self {
        let source = Self::default();
        source.set(Some(products));
        source
    }

    #[must_use]
    pub fn failing() -> Self {
        Self::default()
    }

    pub fn set(&self, products: Option<Vec<Product>>) {
        *self.response.lock().unwrap() = products;
    }

    #[must_use]
    pub fn fetches(&self) -> usize {
        *self.fetches.lock().unwrap()
    }
}

impl ProductSource for FakeSource {
    async fn fetch_all(&self) -> Result<Vec<Product>, SupabaseError> {
        *self.fetches.lock().unwrap() += 1;
        self.response
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| SupabaseError::Api {
                status: 503,
                message: "unavailable".to_string(),
            })
    }
}

/// Order sink that records payloads and hands out sequential ids.
#[derive(Clone, Default)]
pub struct RecordingSink {
    orders: Arc<Mutex<Vec<OrderPayload>>>,
    reject: bool,
}

impl RecordingSink {
    /// A sink that refuses every order.
    #[must_use]
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn orders(&self) -> Vec<OrderPayload> {
        self.orders.lock().unwrap().clone()
    }
}

impl OrderSink for RecordingSink {
    async fn create_order(&self, order: &OrderPayload) -> Result<OrderId, SupabaseError> {
        if self.reject {
            return Err(SupabaseError::Api {
                status: 500,
                message: "insert failed".to_string(),
            });
        }
        let mut orders = self.orders.lock().unwrap();
        orders.push(order.clone());
        Ok(OrderId::new(i64::try_from(orders.len()).unwrap()))
    }
}

/// Catalog options with a short resubscribe delay.
#[must_use]
pub fn fast_options() -> CatalogOptions {
    CatalogOptions {
        resubscribe_delay: Duration::from_millis(20),
        ..CatalogOptions::default()
    }
}

/// Storefront configuration pointing at `data_dir` and an unroutable backend.
#[must_use]
pub fn test_config(data_dir: &std::path::Path) -> StorefrontConfig {
    StorefrontConfig {
        host: IpAddr::from([127, 0, 0, 1]),
        port: 0,
        data_dir: data_dir.to_path_buf(),
        currency: CurrencyCode::AED,
        supabase: SupabaseConfig {
            url: Url::parse("http://127.0.0.1:9/").unwrap(),
            anon_key: SecretString::from("test-anon-key"),
        },
        webhook_secret: SecretString::from(WEBHOOK_SECRET),
        catalog: CatalogConfig::default(),
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// A fully wired storefront router backed by fakes.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub source: FakeSource,
    pub feed: WebhookFeed,
    _dir: TempDir,
}

impl TestApp {
    /// Build the app and wait for the initial catalog load to finish.
    ///
    /// Must be called from inside a Tokio runtime.
    pub async fn start(source: FakeSource) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        let feed = WebhookFeed::new(PRODUCTS_TABLE, config.catalog.feed_buffer);
        let (catalog, _task) = CatalogHandle::spawn(source.clone(), feed.clone(), fast_options());
        // Commands are served only after the initial load and subscribe.
        catalog.state().await.unwrap();

        let supabase = SupabaseClient::new(&config.supabase).unwrap();
        let cart = CartStore::load(FileStore::new(dir.path()), config.currency);
        let state = AppState::new(config, cart, catalog, feed.clone(), supabase);
        let router = dry_storefront::routes::routes().with_state(state.clone());

        Self {
            router,
            state,
            source,
            feed,
            _dir: dir,
        }
    }
}

/// Poll `check` until it returns true or a second passes.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}
