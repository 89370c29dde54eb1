//! Change-feed payloads and the events decoded from them.

use dry_core::{Product, ProductId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Row operation reported by the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A database webhook body as delivered by the backend.
///
/// `record` holds the new row for inserts and updates; `old_record` holds the
/// previous row (at least its primary key) for updates and deletes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangePayload {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub table: String,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub record: Option<Value>,
    #[serde(default)]
    pub old_record: Option<Value>,
}

impl ChangePayload {
    /// Insert payload carrying `product`.
    ///
    /// # Errors
    ///
    /// Returns a JSON error if `product` cannot be serialized.
    pub fn insert(table: &str, product: &Product) -> serde_json::Result<Self> {
        Ok(Self {
            kind: ChangeKind::Insert,
            table: table.to_string(),
            schema: Some("public".to_string()),
            record: Some(serde_json::to_value(product)?),
            old_record: None,
        })
    }

    /// Update payload carrying the new row.
    ///
    /// # Errors
    ///
    /// Returns a JSON error if `product` cannot be serialized.
    pub fn update(table: &str, product: &Product) -> serde_json::Result<Self> {
        Ok(Self {
            kind: ChangeKind::Update,
            old_record: Some(serde_json::json!({ "id": product.id })),
            ..Self::insert(table, product)?
        })
    }

    /// Delete payload carrying only the old primary key.
    #[must_use]
    pub fn delete(table: &str, id: ProductId) -> Self {
        Self {
            kind: ChangeKind::Delete,
            table: table.to_string(),
            schema: Some("public".to_string()),
            record: None,
            old_record: Some(serde_json::json!({ "id": id })),
        }
    }
}

/// A change to the product set, ready to fold into the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    Insert(Product),
    Update(Product),
    Delete(ProductId),
}

impl ChangeEvent {
    /// The id this event touches.
    #[must_use]
    pub const fn product_id(&self) -> ProductId {
        match self {
            Self::Insert(product) | Self::Update(product) => product.id,
            Self::Delete(id) => *id,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ChangeKind {
        match self {
            Self::Insert(_) => ChangeKind::Insert,
            Self::Update(_) => ChangeKind::Update,
            Self::Delete(_) => ChangeKind::Delete,
        }
    }
}

/// A payload that cannot be turned into a [`ChangeEvent`].
#[derive(Debug, Error)]
pub enum MalformedEvent {
    #[error("{kind} event has no record")]
    MissingRecord { kind: ChangeKind },

    #[error("{kind} event record is not a product: {source}")]
    InvalidRecord {
        kind: ChangeKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("DELETE event carries no product id")]
    MissingId,
}

#[derive(Deserialize)]
struct KeyOnly {
    id: ProductId,
}

impl TryFrom<ChangePayload> for ChangeEvent {
    type Error = MalformedEvent;

    fn try_from(payload: ChangePayload) -> Result<Self, Self::Error> {
        let kind = payload.kind;
        match kind {
            ChangeKind::Insert | ChangeKind::Update => {
                let record = payload
                    .record
                    .filter(|r| !r.is_null())
                    .ok_or(MalformedEvent::MissingRecord { kind })?;
                let product: Product = serde_json::from_value(record)
                    .map_err(|source| MalformedEvent::InvalidRecord { kind, source })?;
                Ok(if kind == ChangeKind::Insert {
                    Self::Insert(product)
                } else {
                    Self::Update(product)
                })
            }
            ChangeKind::Delete => payload
                .old_record
                .into_iter()
                .chain(payload.record)
                .find_map(|row| serde_json::from_value::<KeyOnly>(row).ok())
                .map(|key| Self::Delete(key.id))
                .ok_or(MalformedEvent::MissingId),
        }
    }
}
