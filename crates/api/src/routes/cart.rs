//! Cart persistence route.
//!
//! The browser owns the cart; the server only stores the latest snapshot so
//! it survives across devices and sessions.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, instrument};

use greenbasket_core::Cart;

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::error::{ApiJson, AppError, Result};
use crate::middleware::RequireUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartRequest {
    pub cart_items: Option<Cart>,
}

/// `POST /api/cart/update`
///
/// Replaces the stored cart with the submitted mapping (last write wins).
#[instrument(skip(state, body))]
pub async fn update(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    ApiJson(body): ApiJson<UpdateCartRequest>,
) -> Result<Json<Value>> {
    let cart = body
        .cart_items
        .ok_or_else(|| AppError::BadRequest("cartItems is required".to_string()))?;

    let stored = UserRepository::new(state.pool())
        .replace_cart(user_id, &cart)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("User not found".to_string()),
            other => other.into(),
        })?;

    debug!(items = stored.count(), "Cart stored");
    Ok(Json(json!({
        "success": true,
        "message": "Cart updated successfully",
        "cartItems": stored,
    })))
}
