//! Home and shop page handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Response},
};
use tracing::instrument;

use crate::cart::CartView;
use crate::catalog::{Category, FilterQuery, ProductFilter};
use crate::error::Result;
use crate::filters;
use crate::state::AppState;

/// Category choices offered on the shop page.
const SHOP_CATEGORIES: &[(&str, &str)] = &[
    ("all", "All"),
    ("boards", "Boards"),
    ("wheels", "Wheels"),
    ("trucks", "Trucks"),
    ("apparel", "Apparel"),
    ("accessories", "Accessories"),
];

/// A category radio button.
#[derive(Clone)]
pub struct CategoryOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

fn category_options(selected: &Category) -> Vec<CategoryOption> {
    SHOP_CATEGORIES
        .iter()
        .map(|&(value, label)| CategoryOption {
            value,
            label,
            selected: *selected == Category::parse(value),
        })
        .collect()
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub cart: CartView,
    /// Pre-rendered home sections.
    pub sections: String,
}

/// Shop page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/shop.html")]
pub struct ShopTemplate {
    pub cart: CartView,
    /// Pre-rendered product grid.
    pub grid: String,
    pub categories: Vec<CategoryOption>,
    pub sale: bool,
    pub featured: bool,
}

/// Display home page.
#[instrument(skip(state))]
pub async fn home(State(state): State<AppState>) -> impl IntoResponse {
    let cart = state.cart().await.render();
    HomeTemplate {
        cart,
        sections: state.catalog().home(),
    }
}

/// Display the shop grid.
///
/// HTMX requests get only the grid fragment.
#[instrument(skip(state, headers))]
pub async fn shop(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<FilterQuery>,
) -> Result<Response> {
    let filter = ProductFilter::from(query);
    let grid = state.catalog().shop(filter.clone()).await?;

    if headers.contains_key("HX-Request") {
        return Ok(Html(grid).into_response());
    }

    let cart = state.cart().await.render();
    Ok(ShopTemplate {
        cart,
        grid,
        categories: category_options(&filter.category),
        sale: filter.sale,
        featured: filter.featured,
    }
    .into_response())
}
