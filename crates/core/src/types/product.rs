//! Product record as stored in the backend `products` table.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use super::{ProductId, StockStatus};

/// Units at or below which an in-stock product counts as low stock (exclusive).
pub const LOW_STOCK_THRESHOLD: i64 = 10;

/// Rating at or above which a product counts as a best seller.
pub const BEST_SELLER_RATING: f64 = 4.9;

/// A product row.
///
/// `id`, `name` and `price` are required; every other column tolerates
/// `null` or absence and falls back to its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub sale_price: Option<Decimal>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub stock: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub stock_status: StockStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_featured: bool,
}

impl Product {
    /// Sold out when flagged so, or when nothing is left on the shelf.
    #[must_use]
    pub fn is_sold_out(&self) -> bool {
        self.stock_status == StockStatus::SoldOut || self.stock <= 0
    }

    #[must_use]
    pub fn is_coming_soon(&self) -> bool {
        self.stock_status == StockStatus::ComingSoon
    }

    /// Between 1 and 9 units left.
    #[must_use]
    pub const fn is_low_stock(&self) -> bool {
        self.stock > 0 && self.stock < LOW_STOCK_THRESHOLD
    }

    /// A sale price is set and undercuts the list price.
    #[must_use]
    pub fn is_on_sale(&self) -> bool {
        self.sale_price.is_some_and(|sale| sale < self.price)
    }

    #[must_use]
    pub fn is_best_seller(&self) -> bool {
        self.rating() >= BEST_SELLER_RATING
    }

    /// Rating, with unrated products counting as zero.
    #[must_use]
    pub fn rating(&self) -> f64 {
        self.rating.unwrap_or(0.0)
    }

    /// The price a customer pays right now.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        match self.sale_price {
            Some(sale) if sale < self.price => sale,
            _ => self.price,
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn deck() -> Product {
        serde_json::from_value(serde_json::json!({
            "id": 1,
            "name": "Deck",
            "price": 100,
            "stock": 25,
            "category": "boards",
        }))
        .unwrap()
    }

    #[test]
    fn test_deserializes_backend_row() {
        let product: Product = serde_json::from_value(serde_json::json!({
            "id": 7,
            "name": "Cruiser Wheels",
            "description": null,
            "price": 89.5,
            "sale_price": 70,
            "stock": null,
            "category": "wheels",
            "image_url": "https://cdn.example/wheels.png",
            "rating": 4.95,
            "stock_status": "in_stock",
            "is_featured": null,
            "created_at": "2025-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(product.id, ProductId::new(7));
        assert_eq!(product.price, Decimal::new(895, 1));
        assert_eq!(product.stock, 0);
        assert!(!product.is_featured);
        assert!(product.is_on_sale());
        assert!(product.is_best_seller());
    }

    #[test]
    fn test_missing_price_is_rejected() {
        let result: Result<Product, _> =
            serde_json::from_value(serde_json::json!({ "id": 1, "name": "Deck" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_sold_out_by_count_or_flag() {
        let mut product = deck();
        assert!(!product.is_sold_out());

        product.stock = 0;
        assert!(product.is_sold_out());

        product.stock = 5;
        product.stock_status = StockStatus::SoldOut;
        assert!(product.is_sold_out());
    }

    #[test]
    fn test_sale_price_must_undercut() {
        let mut product = deck();
        product.sale_price = Some(Decimal::new(100, 0));
        assert!(!product.is_on_sale());
        assert_eq!(product.effective_price(), Decimal::new(100, 0));

        product.sale_price = Some(Decimal::new(80, 0));
        assert!(product.is_on_sale());
        assert_eq!(product.effective_price(), Decimal::new(80, 0));
    }

    #[test]
    fn test_low_stock_bounds() {
        let mut product = deck();
        product.stock = 9;
        assert!(product.is_low_stock());
        product.stock = 10;
        assert!(!product.is_low_stock());
        product.stock = 0;
        assert!(!product.is_low_stock());
    }
}
