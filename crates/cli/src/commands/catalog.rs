//! Catalog commands.

use std::io::Write;

use dry_core::{CurrencyCode, Product};
use dry_storefront::catalog::{ProductFilter, shelf_price};
use dry_storefront::config::{self, SupabaseConfig};
use dry_storefront::supabase::SupabaseClient;

use super::CliError;

/// Fetch the product table once and print the rows that pass `filter`.
///
/// # Errors
///
/// Fails if configuration is missing, the fetch fails, or output cannot be
/// written.
pub async fn list(filter: &ProductFilter, out: &mut impl Write) -> Result<(), CliError> {
    let currency = config::currency_from_env()?;
    let client = SupabaseClient::new(&SupabaseConfig::from_env()?)?;
    let products = client.list_products().await?;
    tracing::debug!(count = products.len(), "Fetched products");
    print(&filter.apply(&products), currency, out)
}

fn print(products: &[&Product], currency: CurrencyCode, out: &mut impl Write) -> Result<(), CliError> {
    if products.is_empty() {
        writeln!(out, "No products found matching filters.")?;
        return Ok(());
    }

    for product in products {
        writeln!(
            out,
            "{:>6}  {:<32} {:<12} {:>14}  {}",
            product.id,
            product.name,
            product.category,
            shelf_price(product.effective_price(), currency),
            availability(product),
        )?;
    }
    Ok(())
}

fn availability(product: &Product) -> String {
    if product.is_coming_soon() {
        "coming soon".to_string()
    } else if product.is_sold_out() {
        "sold out".to_string()
    } else {
        format!("{} in stock", product.stock)
    }
}
