//! Cart projections and their templates.

use askama::Template;
use askama_web::WebTemplate;
use dry_core::{CurrencyCode, Price};

use super::{CartLineItem, totals_of};

/// Image shown for lines without a product image.
const PLACEHOLDER_IMAGE: &str = "https://placehold.co/100";

/// Cart line display data for templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItemView {
    pub id: i64,
    pub name: String,
    pub image_url: String,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
}

/// Cart display data for templates.
///
/// A pure function of the line items and drawer flag: projecting the same
/// state twice gives equal views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub item_count: u32,
    pub drawer_open: bool,
}

impl CartView {
    pub(super) fn project(items: &[CartLineItem], drawer_open: bool, currency: CurrencyCode) -> Self {
        let totals = totals_of(items);
        Self {
            items: items
                .iter()
                .map(|line| CartItemView {
                    id: line.id.as_i64(),
                    name: line.name.clone(),
                    image_url: line
                        .image_url
                        .clone()
                        .filter(|url| !url.is_empty())
                        .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
                    quantity: line.quantity,
                    price: Price::new(line.price, currency).to_string(),
                    line_price: Price::new(line.line_total(), currency).to_string(),
                })
                .collect(),
            subtotal: Price::new(totals.subtotal, currency).to_string(),
            item_count: totals.item_count,
            drawer_open,
        }
    }

    /// The badge is hidden while the cart is empty.
    #[must_use]
    pub const fn badge_hidden(&self) -> bool {
        self.item_count == 0
    }

    /// Render the drawer fragment.
    ///
    /// # Errors
    ///
    /// Returns an askama error if the template fails to render.
    pub fn render_drawer(&self) -> askama::Result<String> {
        CartDrawerTemplate { cart: self.clone() }.render()
    }

    /// Render the badge fragment.
    ///
    /// # Errors
    ///
    /// Returns an askama error if the template fails to render.
    pub fn render_badge(&self) -> askama::Result<String> {
        CartCountTemplate {
            count: self.item_count,
        }
        .render()
    }
}

/// Cart drawer fragment.
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_drawer.html")]
pub struct CartDrawerTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment.
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}
