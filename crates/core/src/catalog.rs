//! Catalog filtering shared by the listing endpoints and clients.

use rust_decimal::Decimal;

use crate::types::ProductId;

/// Number of products shown in the best-seller strip.
pub const BEST_SELLER_COUNT: usize = 5;

/// The view of a product that cart and catalog arithmetic needs.
pub trait CatalogItem {
    /// Product identifier.
    fn id(&self) -> ProductId;
    /// Display name.
    fn name(&self) -> &str;
    /// Current sell price.
    fn offer_price(&self) -> Decimal;
    /// Whether the product can currently be ordered.
    fn in_stock(&self) -> bool;
}

/// Products that are currently in stock, in their original order.
pub fn in_stock<P: CatalogItem>(products: &[P]) -> impl Iterator<Item = &P> {
    products.iter().filter(|p| p.in_stock())
}

/// The first `n` in-stock products.
#[must_use]
pub fn best_sellers<P: CatalogItem>(products: &[P], n: usize) -> Vec<&P> {
    in_stock(products).take(n).collect()
}

/// In-stock products whose name contains `query`, ignoring case.
///
/// An empty or blank query matches every in-stock product.
#[must_use]
pub fn search<'a, P: CatalogItem>(products: &'a [P], query: &str) -> Vec<&'a P> {
    let needle = query.trim().to_lowercase();
    in_stock(products)
        .filter(|p| needle.is_empty() || p.name().to_lowercase().contains(&needle))
        .collect()
}

/// Look up a product by id.
pub fn find<P: CatalogItem>(products: &[P], id: ProductId) -> Option<&P> {
    products.iter().find(|p| p.id() == id)
}
