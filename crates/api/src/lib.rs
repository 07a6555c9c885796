//! GreenBasket API library.
//!
//! The storefront REST API as a library, so the router can be built and
//! exercised from the integration tests and the binary alike.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
