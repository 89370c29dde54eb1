//! Product filtering for catalog views.

use dry_core::Product;
use serde::Deserialize;

/// Category selection. `All` matches every product.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Category {
    #[default]
    All,
    Named(String),
}

impl Category {
    /// Parse a category selector. Only the exact string `"all"` selects
    /// everything; anything else is matched verbatim against product categories.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s == "all" {
            Self::All
        } else {
            Self::Named(s.to_string())
        }
    }

    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        match self {
            Self::All => true,
            Self::Named(name) => product.category == *name,
        }
    }
}

/// A view's filter selection: category plus the on-sale and featured flags.
///
/// All conditions must hold for a product to pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductFilter {
    pub category: Category,
    pub sale: bool,
    pub featured: bool,
}

impl ProductFilter {
    /// The filter that lets everything through.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn category(category: &str) -> Self {
        Self {
            category: Category::parse(category),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn on_sale(mut self, sale: bool) -> Self {
        self.sale = sale;
        self
    }

    #[must_use]
    pub const fn featured(mut self, featured: bool) -> Self {
        self.featured = featured;
        self
    }

    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        self.category.matches(product)
            && (!self.sale || product.is_on_sale())
            && (!self.featured || product.is_featured)
    }

    /// Keep the products that pass, preserving order.
    pub fn apply<'a, I>(&self, products: I) -> Vec<&'a Product>
    where
        I: IntoIterator<Item = &'a Product>,
    {
        products.into_iter().filter(|p| self.matches(p)).collect()
    }
}

/// Shop query string: `?category=boards&sale=true&featured=false`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterQuery {
    pub category: Option<String>,
    #[serde(default)]
    pub sale: bool,
    #[serde(default)]
    pub featured: bool,
}

impl From<FilterQuery> for ProductFilter {
    fn from(query: FilterQuery) -> Self {
        Self {
            category: query
                .category
                .as_deref()
                // An empty `?category=` is the same as leaving it out.
                .filter(|c| !c.is_empty())
                .map_or(Category::All, Category::parse),
            sale: query.sale,
            featured: query.featured,
        }
    }
}
