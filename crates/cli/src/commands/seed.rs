//! Seed the catalog from a YAML file.
//!
//! Each entry uses the same fields as the seller's product form, plus an
//! optional list of image paths:
//!
//! ```yaml
//! - name: Organic Apples
//!   category: Fruits
//!   price: 6.00
//!   offerPrice: 5.00
//!   description: ["Crisp and sweet", "1 kg bag"]
//!   image: ["/uploads/apples.jpg"]
//! ```

use std::path::Path;

use secrecy::SecretString;
use serde::Deserialize;
use tracing::{error, info};

use greenbasket_api::db;
use greenbasket_api::db::products::ProductRepository;
use greenbasket_api::models::product::{NewProduct, ProductInput};

/// One product entry in a seed file.
#[derive(Debug, Deserialize)]
struct SeedProduct {
    #[serde(flatten)]
    input: ProductInput,
    #[serde(default)]
    image: Vec<String>,
}

/// Parse and validate a seed file, collecting every invalid entry.
fn parse_products(content: &str) -> Result<Vec<NewProduct>, Vec<String>> {
    let entries: Vec<SeedProduct> =
        serde_yaml::from_str(content).map_err(|e| vec![format!("invalid YAML: {e}")])?;

    let mut products = Vec::with_capacity(entries.len());
    let mut errors = Vec::new();
    for (i, entry) in entries.into_iter().enumerate() {
        let name = entry.input.name.clone();
        match NewProduct::from_input(entry.input, entry.image) {
            Ok(product) => products.push(product),
            Err(e) => errors.push(format!("entry {} ({name}): {e}", i + 1)),
        }
    }

    if errors.is_empty() {
        Ok(products)
    } else {
        Err(errors)
    }
}

/// Insert products from a YAML file.
///
/// # Arguments
///
/// * `file_path` - Path to the YAML file
/// * `dry_run` - If true, validate only and do not connect to the database
///
/// # Errors
///
/// Returns an error if `DATABASE_URL` is missing, the file cannot be read or
/// fails validation, or an insert fails.
pub async fn products(file_path: &str, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading products from file");
    let content = tokio::fs::read_to_string(path).await?;

    // Validate before connecting to the database
    let products = match parse_products(&content) {
        Ok(products) => products,
        Err(errors) => {
            error!("Seed file validation failed:");
            for err in &errors {
                error!("  - {err}");
            }
            return Err(format!("{} validation errors found", errors.len()).into());
        }
    };
    info!(products = products.len(), "Seed file validated");

    if dry_run {
        return Ok(());
    }

    let database_url = std::env::var("DATABASE_URL")
        .map(SecretString::from)
        .map_err(|_| "DATABASE_URL not set")?;
    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    let repo = ProductRepository::new(&pool);
    for product in &products {
        let created = repo.create(product).await?;
        info!(id = %created.id, name = %created.name, "Inserted product");
    }

    info!("Seeding complete: {} products inserted", products.len());
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_parse_products() {
        let yaml = r#"
- name: Organic Apples
  category: Fruits
  price: 6.00
  offerPrice: 5.00
  description: ["Crisp and sweet"]
  image: ["/uploads/apples.jpg"]
- name: Oat Milk
  category: Dairy
  price: 4
  offerPrice: 3.5
  inStock: false
"#;
        let products = parse_products(yaml).unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].offer_price, Decimal::new(500, 2));
        assert_eq!(products[0].image, vec!["/uploads/apples.jpg".to_string()]);
        assert!(!products[1].in_stock);
        assert!(products[1].image.is_empty());
    }

    #[test]
    fn test_parse_products_collects_errors() {
        let yaml = r#"
- name: "  "
  category: Fruits
  price: 1
  offerPrice: 1
- name: Pears
  category: Fruits
  price: -1
  offerPrice: 1
"#;
        let errors = parse_products(yaml).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("entry 1"));
        assert!(errors[1].contains("Pears"));
    }

    #[test]
    fn test_bundled_seed_file_is_valid() {
        let content = include_str!("../../seed/products.yaml");
        assert!(parse_products(content).is_ok());
    }
}
