//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Shopper accounts, seller login, session tokens
//! - `payments` - Hosted checkout client for the payment gateway
//! - `webhook` - Gateway webhook verification and interpretation

pub mod auth;
pub mod payments;
pub mod webhook;
