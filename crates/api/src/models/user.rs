//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use greenbasket_core::{Cart, Email, UserId};

/// A shopper account (domain type).
///
/// The password hash never leaves the repository layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Normalized email address.
    pub email: Email,
    /// Persisted cart mapping.
    pub cart_items: Cart,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}
