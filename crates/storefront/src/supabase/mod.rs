//! Supabase REST client.
//!
//! Talks to the PostgREST endpoint under `{url}/rest/v1/` with the project's
//! anon key. Only two calls are needed: list every product, and insert an
//! order.

use std::sync::Arc;

use dry_core::{OrderId, Product};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::catalog::ProductSource;
use crate::checkout::{OrderPayload, OrderSink};
use crate::config::SupabaseConfig;

/// Errors that can occur when talking to Supabase.
#[derive(Debug, Error)]
pub enum SupabaseError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limited by the API gateway.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A write returned no row.
    #[error("Empty response")]
    EmptyResponse,

    /// The configured URL or key cannot be used.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Supabase REST client.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<SupabaseClientInner>,
}

struct SupabaseClientInner {
    client: reqwest::Client,
    rest_url: Url,
}

#[derive(Deserialize)]
struct InsertedRow {
    id: OrderId,
}

impl SupabaseClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns `SupabaseError::InvalidConfig` if the key is not a valid header
    /// value or the URL cannot carry a path, or `SupabaseError::Http` if the
    /// HTTP client fails to build.
    pub fn new(config: &SupabaseConfig) -> Result<Self, SupabaseError> {
        let key = config.anon_key.expose_secret();
        let mut headers = HeaderMap::new();

        let mut apikey = HeaderValue::from_str(key)
            .map_err(|e| SupabaseError::InvalidConfig(format!("Invalid anon key: {e}")))?;
        apikey.set_sensitive(true);
        headers.insert("apikey", apikey);

        let mut bearer = HeaderValue::from_str(&format!("Bearer {key}"))
            .map_err(|e| SupabaseError::InvalidConfig(format!("Invalid anon key: {e}")))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        let rest_url = config
            .url
            .join("rest/v1/")
            .map_err(|e| SupabaseError::InvalidConfig(format!("Invalid Supabase URL: {e}")))?;

        Ok(Self {
            inner: Arc::new(SupabaseClientInner { client, rest_url }),
        })
    }

    /// Base URL for table endpoints.
    #[must_use]
    pub fn rest_url(&self) -> &Url {
        &self.inner.rest_url
    }

    fn table_url(&self, table: &str) -> Result<Url, SupabaseError> {
        self.inner
            .rest_url
            .join(table)
            .map_err(|e| SupabaseError::InvalidConfig(format!("Invalid table '{table}': {e}")))
    }

    /// All products, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `SupabaseError` if the request fails or the body is not a
    /// product list.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, SupabaseError> {
        let mut url = self.table_url("products")?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("order", "id.asc");

        let response = self.inner.client.get(url).send().await?;
        let body = read_body(response).await?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse product list"
            );
            SupabaseError::Parse(e)
        })
    }

    /// Insert an order and return its id.
    ///
    /// # Errors
    ///
    /// Returns `SupabaseError` if the insert is rejected or returns no row.
    #[instrument(skip(self, order), fields(total = %order.total_amount, items = order.items.len()))]
    pub async fn insert_order(&self, order: &OrderPayload) -> Result<OrderId, SupabaseError> {
        let url = self.table_url("orders")?;
        let response = self
            .inner
            .client
            .post(url)
            .header("Prefer", "return=representation")
            .json(order)
            .send()
            .await?;
        let body = read_body(response).await?;

        let rows: Vec<InsertedRow> = serde_json::from_str(&body)?;
        rows.into_iter()
            .next()
            .map(|row| row.id)
            .ok_or(SupabaseError::EmptyResponse)
    }
}

/// Body text of a successful response; maps rate limiting and error statuses.
async fn read_body(response: reqwest::Response) -> Result<String, SupabaseError> {
    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1);
        return Err(SupabaseError::RateLimited(retry_after));
    }

    let text = response.text().await?;

    if !status.is_success() {
        tracing::error!(
            status = %status,
            body = %text.chars().take(500).collect::<String>(),
            "Supabase returned non-success status"
        );
        return Err(SupabaseError::Api {
            status: status.as_u16(),
            message: api_message(&text),
        });
    }

    Ok(text)
}

/// PostgREST error bodies carry a `message`; fall back to the raw text.
fn api_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: String,
    }

    serde_json::from_str::<ErrorBody>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.chars().take(200).collect())
}

impl ProductSource for SupabaseClient {
    async fn fetch_all(&self) -> Result<Vec<Product>, SupabaseError> {
        self.list_products().await
    }
}

impl OrderSink for SupabaseClient {
    async fn create_order(&self, order: &OrderPayload) -> Result<OrderId, SupabaseError> {
        self.insert_order(order).await
    }
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("rest_url", &self.inner.rest_url.as_str())
            .finish_non_exhaustive()
    }
}
