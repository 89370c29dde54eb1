//! Product card, grid, home-section and detail rendering.
//!
//! Every function here is a pure projection: products in, markup out. Calling
//! one twice with the same products yields the same string.

use askama::Template;
use dry_core::{CurrencyCode, Product};
use rust_decimal::Decimal;
use thiserror::Error;

use super::badge::Badge;
use super::views::ViewKind;

/// Category shown in the home page's featured boards section.
pub const BOARDS_CATEGORY: &str = "boards";
/// Category shown in the home page's apparel section.
pub const APPAREL_CATEGORY: &str = "apparel";
/// Apparel products shown on the home page.
pub const APPAREL_LIMIT: usize = 4;

const CARD_PLACEHOLDER_IMAGE: &str = "https://placehold.co/400x300?text=Product";
const DETAIL_PLACEHOLDER_IMAGE: &str = "https://placehold.co/600x600";

/// Shelf price as printed on cards: `AED 100`, `AED 99.5`.
///
/// Trailing zeros are dropped; cart and checkout totals keep two places.
#[must_use]
pub fn shelf_price(amount: Decimal, currency: CurrencyCode) -> String {
    format!("{} {}", currency.code(), amount.normalize())
}

/// Rendering a template failed.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template render failed: {0}")]
    Template(#[from] askama::Error),
}

/// One star in a five-star rating row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Star {
    Full,
    Half,
    Empty,
}

impl Star {
    /// Five stars for `rating`: whole points are full, any remainder adds a
    /// half star, the rest are empty.
    #[must_use]
    pub fn row(rating: f64) -> Vec<Self> {
        let rating = rating.clamp(0.0, 5.0);
        let full = rating.floor();
        let has_half = rating > full;
        (0..5u8)
            .map(|i| {
                let i = f64::from(i);
                if i < full {
                    Self::Full
                } else if has_half && (i - full).abs() < f64::EPSILON {
                    Self::Half
                } else {
                    Self::Empty
                }
            })
            .collect()
    }

    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Full | Self::Empty => "fas fa-star",
            Self::Half => "fas fa-star-half-alt",
        }
    }

    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Full | Self::Half => "text-yellow-500",
            Self::Empty => "text-gray-300",
        }
    }
}

/// What the card's button does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardAction {
    SoldOut,
    NotifyMe,
    AddToCart,
}

impl CardAction {
    #[must_use]
    pub fn for_product(product: &Product) -> Self {
        if product.is_sold_out() {
            Self::SoldOut
        } else if product.is_coming_soon() {
            Self::NotifyMe
        } else {
            Self::AddToCart
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::SoldOut => "SOLD OUT",
            Self::NotifyMe => "NOTIFY ME",
            Self::AddToCart => "ADD TO CART",
        }
    }

    #[must_use]
    pub const fn is_add_to_cart(self) -> bool {
        matches!(self, Self::AddToCart)
    }

    #[must_use]
    pub const fn is_notify_me(self) -> bool {
        matches!(self, Self::NotifyMe)
    }

    #[must_use]
    pub const fn is_disabled(self) -> bool {
        matches!(self, Self::SoldOut)
    }
}

/// Product display data for templates.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductCardView {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub image_url: String,
    /// Image used when `image_url` fails to load.
    pub fallback_image_url: String,
    pub badge: Badge,
    /// List price.
    pub price: String,
    /// Sale price, present only when it undercuts the list price.
    pub sale_price: Option<String>,
    pub stars: Vec<Star>,
    pub action: CardAction,
    pub stock: i64,
    pub sold_out: bool,
}

impl ProductCardView {
    #[must_use]
    pub fn new(product: &Product, currency: CurrencyCode) -> Self {
        Self::with_placeholder(product, currency, CARD_PLACEHOLDER_IMAGE)
    }

    fn with_placeholder(product: &Product, currency: CurrencyCode, placeholder: &str) -> Self {
        Self {
            id: product.id.as_i64(),
            name: product.name.clone(),
            description: product.description.clone().unwrap_or_default(),
            image_url: product
                .image_url
                .clone()
                .filter(|url| !url.is_empty())
                .unwrap_or_else(|| placeholder.to_string()),
            fallback_image_url: format!(
                "https://placehold.co/300x100?text={}",
                urlencoding::encode(&product.name)
            ),
            badge: Badge::for_product(product),
            price: shelf_price(product.price, currency),
            sale_price: product
                .sale_price
                .filter(|_| product.is_on_sale())
                .map(|sale| shelf_price(sale, currency)),
            stars: Star::row(product.rating()),
            action: CardAction::for_product(product),
            stock: product.stock,
            sold_out: product.is_sold_out(),
        }
    }
}

/// Product grid fragment (shop page).
#[derive(Template)]
#[template(path = "partials/product_grid.html")]
pub struct ProductGridTemplate {
    pub cards: Vec<ProductCardView>,
}

/// Home page product sections fragment.
#[derive(Template)]
#[template(path = "partials/home_sections.html")]
pub struct HomeSectionsTemplate {
    pub boards: Vec<ProductCardView>,
    pub apparel: Vec<ProductCardView>,
}

/// Product detail fragment.
#[derive(Template)]
#[template(path = "partials/product_detail.html")]
pub struct ProductDetailTemplate {
    pub product: ProductCardView,
}

/// Render `products` (already filtered) as the markup for `kind`.
///
/// # Errors
///
/// Returns `RenderError` if the template fails to render.
pub fn render(kind: ViewKind, products: &[&Product], currency: CurrencyCode) -> Result<String, RenderError> {
    match kind {
        ViewKind::Home => render_home(products, currency),
        ViewKind::Shop => render_grid(products, currency),
    }
}

/// Shop grid: one card per product, or the no-results state.
///
/// # Errors
///
/// Returns `RenderError` if the template fails to render.
pub fn render_grid(products: &[&Product], currency: CurrencyCode) -> Result<String, RenderError> {
    let cards = products
        .iter()
        .map(|p| ProductCardView::new(p, currency))
        .collect();
    Ok(ProductGridTemplate { cards }.render()?)
}

/// Home sections: featured boards, then the first few apparel items.
///
/// # Errors
///
/// Returns `RenderError` if the template fails to render.
pub fn render_home(products: &[&Product], currency: CurrencyCode) -> Result<String, RenderError> {
    let boards = products
        .iter()
        .filter(|p| p.category == BOARDS_CATEGORY && p.is_featured)
        .map(|p| ProductCardView::new(p, currency))
        .collect();
    let apparel = products
        .iter()
        .filter(|p| p.category == APPAREL_CATEGORY)
        .take(APPAREL_LIMIT)
        .map(|p| ProductCardView::new(p, currency))
        .collect();
    Ok(HomeSectionsTemplate { boards, apparel }.render()?)
}

/// Detail panel for one product.
///
/// # Errors
///
/// Returns `RenderError` if the template fails to render.
pub fn render_detail(product: &Product, currency: CurrencyCode) -> Result<String, RenderError> {
    let mut view = ProductCardView::with_placeholder(product, currency, DETAIL_PLACEHOLDER_IMAGE);
    if view.description.is_empty() {
        view.description = "No description available.".to_string();
    }
    Ok(ProductDetailTemplate { product: view }.render()?)
}
