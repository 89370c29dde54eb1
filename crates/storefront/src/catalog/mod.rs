//! Realtime product catalog.
//!
//! # Architecture
//!
//! - [`CatalogReconciler`] owns the cached product set, keyed and ordered by id
//! - A [`ProductSource`] provides the full set; a [`ChangeFeed`](crate::feed::ChangeFeed)
//!   pushes row changes afterwards
//! - Every change re-renders each mounted view with that view's own filter
//! - [`CatalogHandle`] runs the reconciler on its own task and talks to it over
//!   a command channel
//!
//! Rendering is pure: `render` maps a filtered product slice to markup and
//! never reads anything back from the targets it writes to.

mod badge;
mod filter;
mod reconciler;
mod render;
mod task;
mod views;

pub use badge::Badge;
pub use filter::{Category, FilterQuery, ProductFilter};
pub use reconciler::{CatalogReconciler, CatalogState};
pub use render::{
    APPAREL_CATEGORY, APPAREL_LIMIT, BOARDS_CATEGORY, CardAction, HomeSectionsTemplate,
    ProductCardView, ProductDetailTemplate, ProductGridTemplate, RenderError, Star, render,
    render_detail, render_grid, render_home, shelf_price,
};
pub use task::{CatalogError, CatalogHandle, CatalogOptions};
pub use views::{MountedView, RenderTarget, ViewId, ViewKind, ViewRegistry};

use std::future::Future;

use dry_core::Product;
use thiserror::Error;

use crate::supabase::SupabaseError;

/// Backend table holding products.
pub const PRODUCTS_TABLE: &str = "products";

/// Loading the full product set failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("product fetch failed: {0}")]
    Source(#[from] SupabaseError),
}

/// Where the full product set comes from.
pub trait ProductSource: Send + Sync + 'static {
    /// Fetch every product, in any order.
    ///
    /// # Errors
    ///
    /// Returns `SupabaseError` if the backend cannot be reached or answers
    /// with something other than a product list.
    fn fetch_all(&self) -> impl Future<Output = Result<Vec<Product>, SupabaseError>> + Send;
}
