//! DRY Skateboards storefront library.
//!
//! Holds the cart store and the realtime catalog, plus the HTTP surface that
//! serves them. Exposed as a library so the binary, the CLI and the
//! integration tests share one implementation.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod feed;
pub mod filters;
pub mod routes;
pub mod state;
pub mod storage;
pub mod supabase;
