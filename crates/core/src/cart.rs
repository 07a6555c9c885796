//! Shopping cart quantity mapping.
//!
//! A cart is a mapping of product id to quantity. Clients mutate it locally and
//! push the whole mapping to the server, which stores it verbatim.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::{self, CatalogItem};
use crate::pricing::round_cents;
use crate::types::ProductId;

/// Product id → quantity mapping.
///
/// Serializes as a JSON object keyed by the id, e.g. `{"3": 2, "7": 1}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart(BTreeMap<ProductId, u32>);

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Add `quantity` units of a product, accumulating onto any existing line.
    pub fn add(&mut self, id: ProductId, quantity: u32) {
        let entry = self.0.entry(id).or_insert(0);
        *entry = entry.saturating_add(quantity);
    }

    /// Set the quantity of a product. A quantity of zero removes the line.
    pub fn set_quantity(&mut self, id: ProductId, quantity: u32) {
        if quantity == 0 {
            self.0.remove(&id);
        } else {
            self.0.insert(id, quantity);
        }
    }

    /// Remove a product line. Returns whether it was present.
    pub fn remove(&mut self, id: ProductId) -> bool {
        self.0.remove(&id).is_some()
    }

    /// Quantity for a product (zero if absent).
    #[must_use]
    pub fn quantity(&self, id: ProductId) -> u32 {
        self.0.get(&id).copied().unwrap_or(0)
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.0.values().map(|&q| u64::from(q)).sum()
    }

    /// Cart value at current offer prices, rounded to cents.
    ///
    /// Lines for products not present in `products` are ignored.
    #[must_use]
    pub fn amount<P: CatalogItem>(&self, products: &[P]) -> Decimal {
        let total: Decimal = self
            .0
            .iter()
            .filter_map(|(&id, &qty)| {
                catalog::find(products, id).map(|p| p.offer_price() * Decimal::from(qty))
            })
            .sum();
        round_cents(total)
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(product, quantity)` lines in id order.
    pub fn iter(&self) -> impl Iterator<Item = (ProductId, u32)> + '_ {
        self.0.iter().map(|(&id, &qty)| (id, qty))
    }
}

impl FromIterator<(ProductId, u32)> for Cart {
    fn from_iter<I: IntoIterator<Item = (ProductId, u32)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
