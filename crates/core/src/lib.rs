//! GreenBasket Core - Shared types library.
//!
//! This crate provides the types and pure arithmetic used across GreenBasket:
//! - `api` - The storefront REST API server
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. The optional `postgres` feature adds `sqlx` codecs.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, emails, payment types
//! - [`pricing`] - Server-side order totals
//! - [`cart`] - Product → quantity cart mapping
//! - [`catalog`] - In-stock, best-seller, and search filters

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod pricing;
pub mod types;

pub use cart::Cart;
pub use catalog::CatalogItem;
pub use types::*;
