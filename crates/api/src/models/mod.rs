//! Domain models for the shop API.
//!
//! These types are validated domain objects, separate from the database row
//! types in [`crate::db`]. They serialize to the camelCase JSON the browser
//! client consumes.

pub mod address;
pub mod order;
pub mod product;
pub mod user;

/// Trim a required text field, rejecting blank input.
pub(crate) fn required_text(value: &str, field: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{field} is required"));
    }
    Ok(trimmed.to_string())
}
