//! Order payment and status types.

use serde::{Deserialize, Serialize};

/// How an order is paid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(type_name = "payment_type"))]
pub enum PaymentType {
    /// Cash on delivery.
    #[serde(rename = "COD")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "COD"))]
    CashOnDelivery,
    /// Paid through the hosted checkout.
    #[serde(rename = "Online")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "Online"))]
    Online,
}

impl PaymentType {
    /// Wire/database label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CashOnDelivery => "COD",
            Self::Online => "Online",
        }
    }
}

impl std::fmt::Display for PaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Well-known order status labels.
///
/// The stored status is free text; these are the values the server itself
/// writes. Sellers may use others.
pub mod order_status {
    /// Status of every newly placed order.
    pub const PENDING: &str = "Pending";
    /// Status written once the payment gateway confirms an online payment.
    pub const COMPLETED: &str = "Completed";
}
