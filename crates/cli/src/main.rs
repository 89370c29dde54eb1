//! DRY Skateboards CLI - cart and catalog tools.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart stored in STOREFRONT_DATA_DIR
//! dry cart show
//!
//! # Add one unit of product 12 (looked up in Supabase)
//! dry cart add 12
//!
//! # Take one unit of product 12 back out
//! dry cart qty 12 -- -1
//!
//! # List boards that are on sale
//! dry catalog list --category boards --sale
//! ```
//!
//! # Commands
//!
//! - `cart` - Inspect and edit the persisted cart
//! - `catalog list` - Fetch the product table once and print it

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use dry_core::ProductId;
use dry_storefront::catalog::{FilterQuery, ProductFilter};

mod commands;

#[derive(Parser)]
#[command(name = "dry")]
#[command(author, version, about = "DRY Skateboards storefront tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and edit the persisted cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Read the product catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Print the cart lines and totals
    Show,
    /// Add one unit of a product
    Add {
        /// Product id
        id: ProductId,
    },
    /// Remove a product's line entirely
    Remove {
        /// Product id
        id: ProductId,
    },
    /// Change a line's quantity by a signed delta
    Qty {
        /// Product id
        id: ProductId,
        /// Quantity change, e.g. 1 or -1
        #[arg(allow_hyphen_values = true)]
        delta: i64,
    },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum CatalogAction {
    /// List products, optionally filtered
    List {
        /// Category to show (default: all)
        #[arg(short, long)]
        category: Option<String>,
        /// Only products on sale
        #[arg(long)]
        sale: bool,
        /// Only featured products
        #[arg(long)]
        featured: bool,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    let mut out = std::io::stdout().lock();

    match cli.command {
        Commands::Cart { action } => {
            let mut cart = commands::cart::open()?;
            match action {
                CartAction::Show => {}
                CartAction::Add { id } => commands::cart::add(&mut cart, id).await?,
                CartAction::Remove { id } => cart.remove_item(id)?,
                CartAction::Qty { id, delta } => cart.change_quantity(id, delta)?,
                CartAction::Clear => cart.clear()?,
            }
            commands::cart::print(&cart, &mut out)?;
        }
        Commands::Catalog {
            action:
                CatalogAction::List {
                    category,
                    sale,
                    featured,
                },
        } => {
            let filter: ProductFilter = FilterQuery {
                category,
                sale,
                featured,
            }
            .into();
            commands::catalog::list(&filter, &mut out).await?;
        }
    }

    Ok(())
}
