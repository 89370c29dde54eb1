//! Cart commands.
//!
//! Operates on the same `FileStore` record the storefront reads, so edits
//! made here show up on the next page load.
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATA_DIR` - Directory holding the cart record
//! - `STOREFRONT_CURRENCY` - Display currency (default `AED`)
//! - `SUPABASE_URL`, `SUPABASE_ANON_KEY` - Needed by `cart add` only

use std::io::Write;

use dry_core::{Price, ProductId};
use dry_storefront::cart::{CartProduct, CartStore};
use dry_storefront::config::{self, SupabaseConfig};
use dry_storefront::storage::{FileStore, KeyValueStore};
use dry_storefront::supabase::SupabaseClient;

use super::CliError;

/// Open the persisted cart.
///
/// # Errors
///
/// Returns `CliError::Config` for an unsupported `STOREFRONT_CURRENCY`.
pub fn open() -> Result<CartStore<FileStore>, CliError> {
    let currency = config::currency_from_env()?;
    let dir = config::data_dir_from_env();
    tracing::debug!(dir = %dir.display(), "Opening cart");
    Ok(CartStore::load(FileStore::new(dir), currency))
}

/// Look `id` up in the product table and add one unit of it.
///
/// # Errors
///
/// Fails if Supabase is unreachable, the product is unknown or cannot be
/// bought, or the cart could not be saved.
pub async fn add<S: KeyValueStore>(cart: &mut CartStore<S>, id: ProductId) -> Result<(), CliError> {
    let client = SupabaseClient::new(&SupabaseConfig::from_env()?)?;
    let products = client.list_products().await?;
    let product = products
        .iter()
        .find(|p| p.id == id)
        .ok_or_else(|| CliError::ProductNotFound(id.to_string()))?;

    if product.is_coming_soon() {
        return Err(CliError::Unavailable(product.name.clone(), "coming soon"));
    }
    if product.is_sold_out() {
        return Err(CliError::Unavailable(product.name.clone(), "sold out"));
    }

    cart.add_item(CartProduct::from(product))?;
    tracing::info!(product_id = %id, "Added to cart");
    Ok(())
}

/// Print one line per cart item followed by the totals.
///
/// # Errors
///
/// Returns `CliError::Output` if writing to `out` fails.
pub fn print<S: KeyValueStore>(cart: &CartStore<S>, out: &mut impl Write) -> Result<(), CliError> {
    if cart.is_empty() {
        writeln!(out, "Your cart is empty.")?;
        return Ok(());
    }

    let currency = cart.currency();
    for item in cart.items() {
        writeln!(
            out,
            "{:>6}  {:<32} {:>3} x {}  = {}",
            item.id,
            item.name,
            item.quantity,
            Price::new(item.price, currency),
            Price::new(item.line_total(), currency),
        )?;
    }

    let totals = cart.totals();
    writeln!(
        out,
        "{} item(s), subtotal {}",
        totals.item_count,
        Price::new(totals.subtotal, currency)
    )?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use dry_core::CurrencyCode;
    use dry_storefront::storage::MemoryStore;
    use rust_decimal::Decimal;

    fn board(id: i64, price: i64) -> CartProduct {
        CartProduct {
            id: ProductId::new(id),
            name: format!("Board {id}"),
            price: Decimal::from(price),
            image_url: None,
        }
    }

    fn render(cart: &CartStore<MemoryStore>) -> String {
        let mut out = Vec::new();
        print(cart, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_print_empty_cart() {
        let cart = CartStore::load(MemoryStore::new(), CurrencyCode::AED);
        assert_eq!(render(&cart), "Your cart is empty.\n");
    }

    #[test]
    fn test_print_lines_and_totals() {
        let mut cart = CartStore::load(MemoryStore::new(), CurrencyCode::AED);
        cart.add_item(board(1, 100)).unwrap();
        cart.add_item(board(1, 100)).unwrap();
        cart.add_item(board(2, 50)).unwrap();

        let text = render(&cart);
        assert!(text.contains("Board 1"));
        assert!(text.contains("AED 200.00"));
        assert!(text.ends_with("3 item(s), subtotal AED 250.00\n"));
    }

    #[test]
    fn test_file_store_cart_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let mut cart = CartStore::load(FileStore::new(dir.path()), CurrencyCode::AED);
        cart.add_item(board(7, 80)).unwrap();
        drop(cart);

        let cart = CartStore::load(FileStore::new(dir.path()), CurrencyCode::AED);
        assert_eq!(cart.totals().item_count, 1);
    }
}
