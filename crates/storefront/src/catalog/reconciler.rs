//! The product cache and the views derived from it.

use std::collections::BTreeMap;

use dry_core::{CurrencyCode, Product, ProductId};
use tracing::{debug, error, info, instrument, warn};

use super::filter::ProductFilter;
use super::render::{self, RenderError};
use super::views::{RenderTarget, ViewId, ViewKind, ViewRegistry};
use super::{FetchError, ProductSource};
use crate::feed::{ChangeEvent, ChangePayload};

/// Lifecycle of the product cache.
///
/// `Uninitialized -> Loading -> Ready | Failed`. A failed load may be retried;
/// once `Ready` the cache stays `Ready`, and later reloads refresh it in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CatalogState {
    #[default]
    Uninitialized,
    Loading,
    Ready,
    Failed,
}

impl CatalogState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for CatalogState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owns the cached product set and keeps every mounted view current.
pub struct CatalogReconciler<S> {
    source: S,
    products: BTreeMap<ProductId, Product>,
    state: CatalogState,
    views: ViewRegistry,
    currency: CurrencyCode,
}

impl<S: ProductSource> CatalogReconciler<S> {
    #[must_use]
    pub fn new(source: S, currency: CurrencyCode) -> Self {
        Self {
            source,
            products: BTreeMap::new(),
            state: CatalogState::Uninitialized,
            views: ViewRegistry::new(),
            currency,
        }
    }

    /// Fetch the full product set and replace the cache with it.
    ///
    /// On failure the previous cache is kept. Either way every mounted view
    /// is re-rendered afterwards.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` if the source fails.
    #[instrument(skip(self), fields(state = %self.state))]
    pub async fn load(&mut self) -> Result<usize, FetchError> {
        if self.state != CatalogState::Ready {
            self.state = CatalogState::Loading;
        }

        let result = self.source.fetch_all().await;
        let outcome = match result {
            Ok(products) => {
                self.products = products.into_iter().map(|p| (p.id, p)).collect();
                self.state = CatalogState::Ready;
                info!(count = self.products.len(), "Catalog loaded");
                Ok(self.products.len())
            }
            Err(e) => {
                if self.state == CatalogState::Loading {
                    self.state = CatalogState::Failed;
                }
                error!(error = %e, state = %self.state, "Catalog load failed");
                Err(FetchError::from(e))
            }
        };

        self.render_all();
        outcome
    }

    /// Fold one change into the cache and re-render every mounted view.
    ///
    /// Inserts and updates both upsert, so the last event for an id wins.
    #[instrument(skip(self, event), fields(kind = %event.kind(), product_id = %event.product_id()))]
    pub fn apply_change(&mut self, event: ChangeEvent) {
        match event {
            ChangeEvent::Insert(product) | ChangeEvent::Update(product) => {
                self.products.insert(product.id, product);
            }
            ChangeEvent::Delete(id) => {
                if self.products.remove(&id).is_none() {
                    debug!("Delete for unknown product ignored");
                }
            }
        }
        self.render_all();
    }

    /// Decode a raw feed payload and apply it. Malformed payloads are logged
    /// and dropped without touching the cache.
    ///
    /// Returns whether the payload was applied.
    pub fn receive(&mut self, payload: ChangePayload) -> bool {
        match ChangeEvent::try_from(payload) {
            Ok(event) => {
                self.apply_change(event);
                true
            }
            Err(e) => {
                warn!(error = %e, "Dropping malformed change event");
                false
            }
        }
    }

    /// Mount a view and render it straight away.
    pub fn mount(
        &mut self,
        id: ViewId,
        kind: ViewKind,
        filter: ProductFilter,
        target: impl RenderTarget + 'static,
    ) {
        self.views.mount(id, kind, filter, target);
        if let Err(e) = self.render_view(id) {
            error!(view = %id, error = %e, "View render failed");
        }
    }

    pub fn unmount(&mut self, id: ViewId) -> bool {
        self.views.unmount(id)
    }

    /// Change a view's filter and re-render it.
    ///
    /// Returns the fresh markup, or `None` if no view is mounted under `id`.
    ///
    /// # Errors
    ///
    /// Returns `RenderError` if the view fails to render.
    pub fn set_filter(
        &mut self,
        id: ViewId,
        filter: ProductFilter,
    ) -> Result<Option<String>, RenderError> {
        if !self.views.set_filter(id, filter) {
            return Ok(None);
        }
        self.render_view(id)
    }

    /// Render the detail panel for one product, if it is cached.
    ///
    /// # Errors
    ///
    /// Returns `RenderError` if the template fails to render.
    pub fn render_detail(&self, id: ProductId) -> Result<Option<String>, RenderError> {
        self.get(id)
            .map(|product| render::render_detail(product, self.currency))
            .transpose()
    }

    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<&Product> {
        if self.state == CatalogState::Failed {
            return None;
        }
        self.products.get(&id)
    }

    /// Cached products in id order.
    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    #[must_use]
    pub const fn state(&self) -> CatalogState {
        self.state
    }

    #[must_use]
    pub const fn currency(&self) -> CurrencyCode {
        self.currency
    }

    #[must_use]
    pub const fn views(&self) -> &ViewRegistry {
        &self.views
    }

    /// Products a view may show: nothing while the catalog is `Failed`.
    fn visible(&self, filter: &ProductFilter) -> Vec<&Product> {
        if self.state == CatalogState::Failed {
            return Vec::new();
        }
        filter.apply(self.products.values())
    }

    fn render_view(&self, id: ViewId) -> Result<Option<String>, RenderError> {
        let Some(view) = self.views.get(id) else {
            return Ok(None);
        };
        let markup = render::render(view.kind, &self.visible(&view.filter), self.currency)?;
        view.write(markup.clone());
        Ok(Some(markup))
    }

    fn render_all(&self) {
        for (id, view) in self.views.iter() {
            match render::render(view.kind, &self.visible(&view.filter), self.currency) {
                Ok(markup) => view.write(markup),
                Err(e) => error!(view = %id, error = %e, "View render failed"),
            }
        }
    }
}
