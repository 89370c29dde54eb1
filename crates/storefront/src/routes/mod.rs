//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page
//!
//! # Catalog
//! GET  /shop                   - Product grid (?category=&sale=&featured=)
//! GET  /products/{id}          - Product detail
//! POST /products/{id}/notify   - Back-in-stock request (returns flash fragment)
//!
//! # Cart (HTMX fragments)
//! GET  /cart                   - Cart page
//! GET  /cart/count             - Cart count badge (fragment)
//! POST /cart/add               - Add one unit (returns drawer, triggers cart-updated)
//! POST /cart/update            - Change quantity by a delta (returns drawer)
//! POST /cart/remove            - Remove a line (returns drawer)
//! POST /cart/drawer            - Open or close the drawer (returns drawer)
//! POST /cart/clear             - Empty the cart (returns drawer, triggers cart-updated)
//!
//! # Checkout
//! GET  /checkout               - Checkout page (redirects home when the cart is empty)
//! POST /checkout               - Place order
//!
//! # Backend hooks (x-webhook-secret)
//! POST /hooks/products         - Database webhook for the products table
//! POST /catalog/reload         - Re-run the full catalog load
//! ```

pub mod cart;
pub mod checkout;
pub mod home;
pub mod hooks;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/drawer", post(cart::drawer))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Home page
        .route("/", get(home::home))
        // Catalog
        .route("/shop", get(home::shop))
        .route("/products/{id}", get(products::show))
        .route("/products/{id}/notify", post(products::notify))
        // Cart routes
        .nest("/cart", cart_routes())
        // Checkout
        .route("/checkout", get(checkout::show).post(checkout::submit))
        // Backend hooks
        .route("/hooks/products", post(hooks::products))
        .route("/catalog/reload", post(hooks::reload))
}
