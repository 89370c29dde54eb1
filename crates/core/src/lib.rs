//! DRY Skateboards core - shared types library.
//!
//! This crate provides the domain types used by every storefront component:
//! - `storefront` - Cart store, catalog reconciler and the public site
//! - `cli` - Command-line access to the local cart and the live catalog
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no storage.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, emails, stock/order statuses and the product record

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
