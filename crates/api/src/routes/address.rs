//! Shipping address routes.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument};

use crate::db::addresses::AddressRepository;
use crate::error::{ApiJson, AppError, Result};
use crate::middleware::RequireUser;
use crate::models::address::{AddressInput, NewAddress};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddAddressRequest {
    pub address: Option<AddressInput>,
}

/// `POST /api/address/add`
#[instrument(skip(state, body))]
pub async fn add(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    ApiJson(body): ApiJson<AddAddressRequest>,
) -> Result<Json<Value>> {
    let input = body
        .address
        .ok_or_else(|| AppError::BadRequest("address is required".to_string()))?;
    let address = NewAddress::try_from(input).map_err(AppError::BadRequest)?;

    let created = AddressRepository::new(state.pool())
        .create(user_id, &address)
        .await?;
    info!(address_id = %created.id, "Address added");

    Ok(Json(json!({
        "success": true,
        "message": "Address added successfully",
        "address": created,
    })))
}

/// `GET /api/address/get`
///
/// The caller's addresses, oldest first.
#[instrument(skip(state))]
pub async fn get(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
) -> Result<Json<Value>> {
    let addresses = AddressRepository::new(state.pool())
        .list_for_user(user_id)
        .await?;

    Ok(Json(json!({ "success": true, "addresses": addresses })))
}
