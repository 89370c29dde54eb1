//! Backend webhook handlers.
//!
//! Both endpoints require the shared secret in `x-webhook-secret`.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use secrecy::ExposeSecret;
use serde_json::json;
use tracing::{info, instrument};

use crate::error::{AppError, Result};
use crate::feed::ChangePayload;
use crate::state::AppState;

/// Header carrying the shared webhook secret.
pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

/// Compare without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<()> {
    let presented = headers
        .get(WEBHOOK_SECRET_HEADER)
        .map(|v| v.as_bytes())
        .unwrap_or_default();
    let expected = state.config().webhook_secret.expose_secret().as_bytes();

    if constant_time_eq(presented, expected) {
        Ok(())
    } else {
        Err(AppError::Unauthorized("invalid webhook secret".to_string()))
    }
}

/// Receive a products-table change from the database.
#[instrument(skip_all)]
pub async fn products(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ChangePayload>,
) -> Result<impl IntoResponse> {
    authorize(&state, &headers)?;
    state.feed().publish(payload).await?;
    Ok(StatusCode::ACCEPTED)
}

/// Re-run the full catalog load.
#[instrument(skip(state, headers))]
pub async fn reload(State(state): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse> {
    authorize(&state, &headers)?;
    let count = state.catalog().reload().await?;
    info!(count, "Catalog reloaded on request");
    Ok(Json(json!({ "products": count })))
}
