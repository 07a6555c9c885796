//! Product domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use greenbasket_core::pricing::round_cents;
use greenbasket_core::{CatalogItem, ProductId};

use super::required_text;

/// A catalog product (domain type).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Description lines.
    pub description: Vec<String>,
    /// Category label.
    pub category: String,
    /// List price.
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub price: Decimal,
    /// Discounted sell price. This is what orders are charged.
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub offer_price: Decimal,
    /// Image URL paths.
    pub image: Vec<String>,
    /// Whether the product can currently be ordered.
    pub in_stock: bool,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl CatalogItem for Product {
    fn id(&self) -> ProductId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn offer_price(&self) -> Decimal {
        self.offer_price
    }

    fn in_stock(&self) -> bool {
        self.in_stock
    }
}

/// Product fields submitted by the seller (the `productData` form field).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub description: Vec<String>,
    pub category: String,
    pub price: Decimal,
    pub offer_price: Decimal,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
}

const fn default_in_stock() -> bool {
    true
}

/// A validated product ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub description: Vec<String>,
    pub category: String,
    pub price: Decimal,
    pub offer_price: Decimal,
    pub image: Vec<String>,
    pub in_stock: bool,
}

impl NewProduct {
    /// Validate seller input and attach the stored image paths.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first invalid field.
    pub fn from_input(input: ProductInput, image: Vec<String>) -> Result<Self, String> {
        let name = required_text(&input.name, "name")?;
        let category = required_text(&input.category, "category")?;
        if input.price.is_sign_negative() || input.offer_price.is_sign_negative() {
            return Err("prices cannot be negative".to_string());
        }

        let description = input
            .description
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();

        Ok(Self {
            name,
            description,
            category,
            price: round_cents(input.price),
            offer_price: round_cents(input.offer_price),
            image,
            in_stock: input.in_stock,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input(json: &str) -> ProductInput {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_product_input_accepts_numbers_and_defaults() {
        let input = input(r#"{"name":"Apple","category":"Fruits","price":5,"offerPrice":4.5}"#);
        assert!(input.in_stock);
        assert!(input.description.is_empty());
        assert_eq!(input.offer_price, Decimal::new(45, 1));
    }

    #[test]
    fn test_new_product_trims_and_rounds() {
        let input = input(
            r#"{"name":"  Apple ","description":["Crisp", "  "],"category":"Fruits","price":5.005,"offerPrice":4.5}"#,
        );
        let product = NewProduct::from_input(input, vec!["/uploads/a.png".into()]).unwrap();
        assert_eq!(product.name, "Apple");
        assert_eq!(product.description, vec!["Crisp".to_string()]);
        assert_eq!(product.price, Decimal::new(501, 2));
        assert_eq!(product.image.len(), 1);
    }

    #[test]
    fn test_new_product_rejects_blank_and_negative() {
        let blank = input(r#"{"name":" ","category":"Fruits","price":1,"offerPrice":1}"#);
        assert!(NewProduct::from_input(blank, vec![]).is_err());

        let negative = input(r#"{"name":"Apple","category":"Fruits","price":1,"offerPrice":-1}"#);
        assert_eq!(
            NewProduct::from_input(negative, vec![]).unwrap_err(),
            "prices cannot be negative"
        );
    }

    #[test]
    fn test_product_serializes_prices_as_numbers() {
        let product = Product {
            id: ProductId::new(1),
            name: "Apple".into(),
            description: vec![],
            category: "Fruits".into(),
            price: Decimal::new(500, 2),
            offer_price: Decimal::new(450, 2),
            image: vec![],
            in_stock: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["offerPrice"], serde_json::json!(4.5));
        assert_eq!(json["inStock"], serde_json::json!(true));
    }
}
