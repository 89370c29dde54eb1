//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! Mutations answer with the re-rendered drawer and fire `cart-updated` so the
//! header badge refreshes itself.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{AppendHeaders, IntoResponse, Response},
};
use dry_core::ProductId;
use serde::Deserialize;
use tracing::instrument;

use crate::cart::{CartCountTemplate, CartDrawerTemplate, CartProduct, CartView};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::state::AppState;

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: i64,
}

/// Update quantity form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: i64,
    pub delta: i64,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: i64,
}

/// Drawer toggle form data.
#[derive(Debug, Deserialize)]
pub struct DrawerForm {
    pub open: bool,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub cart: CartView,
}

fn drawer_response(cart: CartView) -> Response {
    (
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartDrawerTemplate { cart },
    )
        .into_response()
}

/// Display cart page.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>) -> impl IntoResponse {
    CartShowTemplate {
        cart: state.cart().await.render(),
    }
}

/// Cart count badge (HTMX).
#[instrument(skip(state))]
pub async fn count(State(state): State<AppState>) -> impl IntoResponse {
    CartCountTemplate {
        count: state.cart().await.totals().item_count,
    }
}

/// Add one unit of a product (HTMX).
///
/// The product must be in the catalog and purchasable. Sold-out and
/// coming-soon products are refused.
#[instrument(skip(state))]
pub async fn add(
    State(state): State<AppState>,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let id = ProductId::new(form.product_id);
    let product = state
        .catalog()
        .product(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    if product.is_sold_out() || product.is_coming_soon() {
        return Err(AppError::Conflict(format!(
            "{} is not available to order",
            product.name
        )));
    }

    let mut cart = state.cart().await;
    cart.add_item(CartProduct::from(&product))?;
    add_breadcrumb("cart", "Added to cart", Some(&[("product_id", id.to_string().as_str())]));

    Ok(drawer_response(cart.render()))
}

/// Change a line's quantity by a signed delta (HTMX).
#[instrument(skip(state))]
pub async fn update(
    State(state): State<AppState>,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let mut cart = state.cart().await;
    cart.change_quantity(ProductId::new(form.product_id), form.delta)?;
    Ok(drawer_response(cart.render()))
}

/// Remove a line (HTMX).
#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    let mut cart = state.cart().await;
    cart.remove_item(ProductId::new(form.product_id))?;
    Ok(drawer_response(cart.render()))
}

/// Empty the cart (HTMX). Retries a clear that failed after checkout.
#[instrument(skip(state))]
pub async fn clear(State(state): State<AppState>) -> Result<Response> {
    let mut cart = state.cart().await;
    cart.clear()?;
    add_breadcrumb("cart", "Cart cleared", None);
    Ok(drawer_response(cart.render()))
}

/// Open or close the drawer (HTMX).
#[instrument(skip(state))]
pub async fn drawer(
    State(state): State<AppState>,
    Form(form): Form<DrawerForm>,
) -> impl IntoResponse {
    let mut cart = state.cart().await;
    if form.open {
        cart.open_drawer();
    } else {
        cart.close_drawer();
    }
    CartDrawerTemplate {
        cart: cart.render(),
    }
}
