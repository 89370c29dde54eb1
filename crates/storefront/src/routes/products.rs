//! Product detail and back-in-stock notification handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use dry_core::ProductId;
use tracing::instrument;

use crate::cart::CartView;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::state::AppState;

/// Product page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/product.html")]
pub struct ProductTemplate {
    pub cart: CartView,
    pub name: String,
    /// Pre-rendered detail panel.
    pub detail: String,
}

/// Notification confirmation flash (HTMX fragment).
#[derive(Template, WebTemplate)]
#[template(path = "partials/notify_flash.html")]
pub struct NotifyFlashTemplate {
    pub name: String,
}

/// Display a product.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(id): Path<i64>) -> Result<impl IntoResponse> {
    let id = ProductId::new(id);
    let product = state
        .catalog()
        .product(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
    let detail = state
        .catalog()
        .detail(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    let cart = state.cart().await.render();
    Ok(ProductTemplate {
        cart,
        name: product.name,
        detail,
    })
}

/// Register interest in a product that is not on sale yet (HTMX).
///
/// Only acknowledged and logged; no address is collected.
#[instrument(skip(state))]
pub async fn notify(State(state): State<AppState>, Path(id): Path<i64>) -> Result<impl IntoResponse> {
    let id = ProductId::new(id);
    let product = state
        .catalog()
        .product(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    tracing::info!(product_id = %id, "Back-in-stock notification requested");
    add_breadcrumb(
        "catalog",
        "Notify me requested",
        Some(&[("product_id", id.to_string().as_str())]),
    );

    Ok(NotifyFlashTemplate { name: product.name })
}
