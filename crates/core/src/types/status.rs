//! Status enums for products and orders.

use serde::{Deserialize, Serialize};

/// Merchandising status stored on a product row.
///
/// `low_stock` is normally derived from the stock count rather than stored,
/// but rows that carry it are accepted. Unrecognised values deserialize as
/// [`StockStatus::Unknown`] and behave like `in_stock`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    #[default]
    InStock,
    LowStock,
    SoldOut,
    ComingSoon,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InStock | Self::Unknown => write!(f, "in_stock"),
            Self::LowStock => write!(f, "low_stock"),
            Self::SoldOut => write!(f, "sold_out"),
            Self::ComingSoon => write!(f, "coming_soon"),
        }
    }
}

/// Order status written with a new order.
///
/// Payment is simulated, so checkout always writes [`OrderStatus::Paid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Shipped,
    Cancelled,
}
