//! Registry of mounted catalog views.
//!
//! The reconciler re-renders exactly the views it has been told about; it
//! never checks what might be on screen. Each view carries its own filter
//! selection and writes its markup into a [`RenderTarget`].

use std::collections::BTreeMap;
use std::fmt;

use tokio::sync::watch;

use super::filter::ProductFilter;

/// Name of a mounted view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewId(&'static str);

impl ViewId {
    /// The home page product sections.
    pub const HOME: Self = Self("home");
    /// The shop page grid.
    pub const SHOP: Self = Self("shop");

    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Which projection a view shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    /// Featured boards and an apparel strip.
    Home,
    /// Filterable product grid.
    Shop,
}

/// Write-only sink for rendered markup.
pub trait RenderTarget: Send + Sync {
    fn write(&self, markup: String);
}

impl RenderTarget for watch::Sender<String> {
    fn write(&self, markup: String) {
        self.send_replace(markup);
    }
}

/// A view the reconciler keeps up to date.
pub struct MountedView {
    pub kind: ViewKind,
    pub filter: ProductFilter,
    target: Box<dyn RenderTarget>,
}

impl MountedView {
    pub fn write(&self, markup: String) {
        self.target.write(markup);
    }
}

impl fmt::Debug for MountedView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountedView")
            .field("kind", &self.kind)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

/// The set of mounted views, ordered by name.
#[derive(Debug, Default)]
pub struct ViewRegistry {
    views: BTreeMap<ViewId, MountedView>,
}

impl ViewRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount a view, replacing any view already mounted under `id`.
    pub fn mount(
        &mut self,
        id: ViewId,
        kind: ViewKind,
        filter: ProductFilter,
        target: impl RenderTarget + 'static,
    ) {
        self.views.insert(
            id,
            MountedView {
                kind,
                filter,
                target: Box::new(target),
            },
        );
    }

    /// Returns `true` if a view was mounted under `id`.
    pub fn unmount(&mut self, id: ViewId) -> bool {
        self.views.remove(&id).is_some()
    }

    /// Replace the filter of a mounted view. Returns `false` if none is mounted.
    pub fn set_filter(&mut self, id: ViewId, filter: ProductFilter) -> bool {
        match self.views.get_mut(&id) {
            Some(view) => {
                view.filter = filter;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn get(&self, id: ViewId) -> Option<&MountedView> {
        self.views.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ViewId, &MountedView)> {
        self.views.iter().map(|(id, view)| (*id, view))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.views.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}
