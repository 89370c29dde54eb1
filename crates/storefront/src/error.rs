//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::cart::PersistenceError;
use crate::catalog::{CatalogError, RenderError};
use crate::checkout::CheckoutError;
use crate::feed::FeedError;

/// Shown when a cart mutation could not be written to storage.
pub const CART_NOT_SAVED: &str = "Your cart could not be saved. Please try again.";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Cart could not be persisted.
    #[error("Cart persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Catalog task failed or is gone.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Checkout failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Change feed rejected a payload.
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    /// Template rendering failed.
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller did not present valid credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request conflicts with current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<askama::Error> for AppError {
    fn from(err: askama::Error) -> Self {
        Self::Render(RenderError::from(err))
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Persistence(_) | Self::Feed(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Catalog(err) => match err {
                CatalogError::Stopped => StatusCode::SERVICE_UNAVAILABLE,
                CatalogError::Fetch(_) => StatusCode::BAD_GATEWAY,
                CatalogError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Checkout(err) => match err {
                CheckoutError::Order(_) => StatusCode::BAD_GATEWAY,
                CheckoutError::EmptyCart => StatusCode::CONFLICT,
                CheckoutError::CartNotCleared { .. } => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            },
            Self::Render(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    const fn is_server_error(&self) -> bool {
        match self {
            Self::Persistence(_)
            | Self::Catalog(_)
            | Self::Feed(_)
            | Self::Render(_)
            | Self::Internal(_) => true,
            Self::Checkout(err) => !err.is_validation(),
            _ => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Persistence(_) => CART_NOT_SAVED.to_string(),
            Self::Catalog(_) | Self::Feed(_) => "Catalog temporarily unavailable".to_string(),
            Self::Render(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Checkout(CheckoutError::Order(_)) => {
                "Failed to place order. Please try again.".to_string()
            }
            Self::Checkout(err) => err.to_string(),
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "12")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
