//! CLI command implementations.

pub mod cart;
pub mod catalog;

use dry_storefront::cart::PersistenceError;
use dry_storefront::config::ConfigError;
use dry_storefront::supabase::SupabaseError;
use thiserror::Error;

/// Errors surfaced by `dry` commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Persistence(#[from] PersistenceError),

    #[error("Supabase error: {0}")]
    Supabase(#[from] SupabaseError),

    #[error("Product {0} not found")]
    ProductNotFound(String),

    #[error("Product {0} cannot be added: {1}")]
    Unavailable(String, &'static str),

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}
