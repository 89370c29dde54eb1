//! Checkout route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use dry_core::{CurrencyCode, Price};
use tracing::instrument;

use crate::cart::CartView;
use crate::checkout::{CheckoutError, CheckoutForm, OrderSummaryView, PlacedOrder, place_order};
use crate::error::add_breadcrumb;
use crate::filters;
use crate::state::AppState;

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub cart: CartView,
    pub summary: OrderSummaryView,
    /// Shipping fields are echoed back; card fields never are.
    pub form: CheckoutForm,
    pub error: Option<String>,
}

/// Order confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/success.html")]
pub struct CheckoutSuccessTemplate {
    pub cart: CartView,
    pub order_id: String,
    pub total: String,
    /// Set when the stored cart outlived the order.
    pub notice: Option<String>,
}

impl CheckoutSuccessTemplate {
    fn new(cart: CartView, placed: &PlacedOrder, currency: CurrencyCode) -> Self {
        Self {
            cart,
            order_id: placed.id.to_string(),
            total: Price::new(placed.total, currency).to_string(),
            notice: None,
        }
    }
}

/// Display checkout page. An empty cart sends the shopper home.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>) -> Response {
    let cart = state.cart().await;
    if cart.is_empty() {
        return Redirect::to("/").into_response();
    }

    CheckoutTemplate {
        cart: cart.render(),
        summary: OrderSummaryView::new(&cart.snapshot(), cart.currency()),
        form: CheckoutForm::default(),
        error: None,
    }
    .into_response()
}

/// Place the order.
#[instrument(skip(state, form))]
pub async fn submit(State(state): State<AppState>, Form(form): Form<CheckoutForm>) -> Response {
    // Held until the order is stored so the lines cleared are the lines ordered.
    let mut cart = state.cart().await;
    let currency = cart.currency();

    match place_order(&mut cart, state.supabase(), &form).await {
        Ok(placed) => {
            add_breadcrumb(
                "checkout",
                "Order placed",
                Some(&[("order_id", placed.id.to_string().as_str())]),
            );
            CheckoutSuccessTemplate::new(cart.render(), &placed, currency).into_response()
        }
        Err(CheckoutError::EmptyCart) => Redirect::to("/").into_response(),
        Err(ref err @ CheckoutError::CartNotCleared { ref order, .. }) => {
            tracing::error!(error = %err, "Stored cart survived a placed order");
            let page = CheckoutSuccessTemplate {
                notice: Some(err.to_string()),
                ..CheckoutSuccessTemplate::new(cart.render(), order, currency)
            };
            (StatusCode::SERVICE_UNAVAILABLE, page).into_response()
        }
        Err(err) => {
            let status = if err.is_validation() {
                StatusCode::UNPROCESSABLE_ENTITY
            } else {
                tracing::error!(error = %err, "Checkout failed");
                StatusCode::BAD_GATEWAY
            };
            let page = CheckoutTemplate {
                cart: cart.render(),
                summary: OrderSummaryView::new(&cart.snapshot(), currency),
                form: CheckoutForm {
                    card_number: String::new(),
                    card_expiry: String::new(),
                    card_cvc: String::new(),
                    ..form
                },
                error: Some(err.to_string()),
            };
            (status, page).into_response()
        }
    }
}
