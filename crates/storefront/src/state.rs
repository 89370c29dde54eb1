//! Application state shared across handlers.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use crate::cart::CartStore;
use crate::catalog::CatalogHandle;
use crate::config::StorefrontConfig;
use crate::feed::WebhookFeed;
use crate::storage::FileStore;
use crate::supabase::SupabaseClient;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. The storefront serves one
/// shopper per process, so there is exactly one cart behind a mutex.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    cart: Mutex<CartStore<FileStore>>,
    catalog: CatalogHandle,
    feed: WebhookFeed,
    supabase: SupabaseClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `cart` - The loaded cart
    /// * `catalog` - Handle to the running catalog reconciler
    /// * `feed` - Change feed the webhook route publishes into
    /// * `supabase` - Backend client used for orders
    #[must_use]
    pub fn new(
        config: StorefrontConfig,
        cart: CartStore<FileStore>,
        catalog: CatalogHandle,
        feed: WebhookFeed,
        supabase: SupabaseClient,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                cart: Mutex::new(cart),
                catalog,
                feed,
                supabase,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Lock the cart for reading or mutation.
    pub async fn cart(&self) -> MutexGuard<'_, CartStore<FileStore>> {
        self.inner.cart.lock().await
    }

    /// Get a reference to the catalog handle.
    #[must_use]
    pub fn catalog(&self) -> &CatalogHandle {
        &self.inner.catalog
    }

    /// Get a reference to the product change feed.
    #[must_use]
    pub fn feed(&self) -> &WebhookFeed {
        &self.inner.feed
    }

    /// Get a reference to the Supabase client.
    #[must_use]
    pub fn supabase(&self) -> &SupabaseClient {
        &self.inner.supabase
    }
}
