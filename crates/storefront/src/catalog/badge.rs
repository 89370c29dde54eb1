//! Product badges.

use dry_core::Product;

/// The single badge shown on a product card.
///
/// Variants are listed in precedence order; [`Badge::for_product`] picks the
/// first one that applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Badge {
    SoldOut,
    ComingSoon,
    LowStock,
    OnSale,
    BestSeller,
    None,
}

impl Badge {
    #[must_use]
    pub fn for_product(product: &Product) -> Self {
        if product.is_sold_out() {
            Self::SoldOut
        } else if product.is_coming_soon() {
            Self::ComingSoon
        } else if product.is_low_stock() {
            Self::LowStock
        } else if product.is_on_sale() {
            Self::OnSale
        } else if product.is_best_seller() {
            Self::BestSeller
        } else {
            Self::None
        }
    }

    #[must_use]
    pub const fn label(self) -> Option<&'static str> {
        match self {
            Self::SoldOut => Some("SOLD OUT"),
            Self::ComingSoon => Some("COMING SOON"),
            Self::LowStock => Some("LOW STOCK"),
            Self::OnSale => Some("ON SALE"),
            Self::BestSeller => Some("BEST SELLER"),
            Self::None => None,
        }
    }

    /// Colour classes for the badge chip.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::SoldOut => "bg-gray-800 text-white",
            Self::LowStock => "bg-rad-red text-white",
            Self::ComingSoon | Self::OnSale | Self::BestSeller | Self::None => {
                "bg-rad-neon text-rad-black"
            }
        }
    }
}
