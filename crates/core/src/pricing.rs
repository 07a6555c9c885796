//! Server-side order pricing.
//!
//! Order totals are always recomputed from authoritative product prices; the
//! amount a client claims is never read. A fixed surcharge is applied to the
//! line total and the result is rounded to a whole currency unit, half up.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Fixed surcharge multiplier applied to every order (2%).
pub const SURCHARGE_MULTIPLIER: Decimal = Decimal::from_parts(102, 0, 0, false, 2);

/// Errors that can occur while converting prices for the payment gateway.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    /// Price does not fit the gateway's integer minor-unit field.
    #[error("price {0} is out of range for the payment gateway")]
    OutOfRange(Decimal),
}

/// One priced line of an order: the current offer price and the quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    /// Offer price per unit at the time the order is placed.
    pub unit_price: Decimal,
    /// Number of units.
    pub quantity: u32,
}

impl PricedLine {
    /// Create a priced line.
    #[must_use]
    pub const fn new(unit_price: Decimal, quantity: u32) -> Self {
        Self {
            unit_price,
            quantity,
        }
    }

    /// `unit_price × quantity`.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Compute the amount charged for an order.
///
/// `round_half_up(Σ unit_price × quantity × 1.02)` to zero decimal places.
///
/// ```
/// use greenbasket_core::pricing::{PricedLine, order_amount};
/// use rust_decimal::Decimal;
///
/// let lines = [PricedLine::new(Decimal::new(1000, 2), 2), PricedLine::new(Decimal::new(550, 2), 1)];
/// assert_eq!(order_amount(&lines), Decimal::from(26));
/// ```
#[must_use]
pub fn order_amount(lines: &[PricedLine]) -> Decimal {
    let total: Decimal = lines.iter().map(PricedLine::subtotal).sum();
    (total * SURCHARGE_MULTIPLIER).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Per-unit amount sent to the hosted checkout, in minor units (cents).
///
/// The surcharge is folded into each unit so the checkout total matches the
/// order amount up to rounding.
///
/// # Errors
///
/// Returns `PricingError::OutOfRange` if the value does not fit in an `i64`.
pub fn unit_amount_minor(unit_price: Decimal) -> Result<i64, PricingError> {
    unit_price
        .checked_mul(SURCHARGE_MULTIPLIER)
        .and_then(|v| v.checked_mul(Decimal::ONE_HUNDRED))
        .map(|v| v.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|v| v.to_i64())
        .ok_or(PricingError::OutOfRange(unit_price))
}

/// Round a money value to cents, half up.
#[must_use]
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
