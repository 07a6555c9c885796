//! Shipping address domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use greenbasket_core::{AddressId, Email, UserId};

use super::required_text;

/// A shipping address owned by a user (domain type).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zipcode: String,
    pub country: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Address fields as submitted by the client.
///
/// `zipcode` and `phone` arrive as either JSON strings or numbers.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub street: String,
    pub city: String,
    pub state: String,
    #[serde(deserialize_with = "string_or_number")]
    pub zipcode: String,
    pub country: String,
    #[serde(deserialize_with = "string_or_number")]
    pub phone: String,
}

/// A validated address ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAddress {
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zipcode: String,
    pub country: String,
    pub phone: String,
}

impl TryFrom<AddressInput> for NewAddress {
    type Error = String;

    fn try_from(input: AddressInput) -> Result<Self, Self::Error> {
        let email = Email::parse(&input.email).map_err(|e| e.to_string())?;
        Ok(Self {
            first_name: required_text(&input.first_name, "firstName")?,
            last_name: required_text(&input.last_name, "lastName")?,
            email,
            street: required_text(&input.street, "street")?,
            city: required_text(&input.city, "city")?,
            state: required_text(&input.state, "state")?,
            zipcode: required_text(&input.zipcode, "zipcode")?,
            country: required_text(&input.country, "country")?,
            phone: required_text(&input.phone, "phone")?,
        })
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}
