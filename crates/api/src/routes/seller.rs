//! Seller session routes.
//!
//! There is a single seller account whose credentials come from the
//! environment; no seller rows live in the database.

use axum::{Json, extract::State};
use axum_extra::extract::cookie::CookieJar;
use serde_json::{Value, json};
use tracing::{info, instrument};

use super::user::LoginRequest;
use crate::error::{ApiJson, Result};
use crate::middleware::{RequireSeller, SELLER_COOKIE, removal_cookie, session_cookie};
use crate::services::auth::{AuthError, verify_seller};
use crate::state::AppState;

/// `POST /api/seller/login`
#[instrument(skip(state, jar, body))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<(CookieJar, Json<Value>)> {
    let seller = &state.config().seller;
    verify_seller(seller, &body.email, &body.password)?;

    let token = state
        .tokens()
        .issue_seller(&seller.email)
        .map_err(AuthError::from)?;
    let cookie = session_cookie(
        state.config(),
        SELLER_COOKIE,
        token,
        state.tokens().validity(),
    );

    info!("Seller logged in");
    Ok((
        jar.add(cookie),
        Json(json!({ "success": true, "message": "Logged In" })),
    ))
}

/// `GET /api/seller/is-auth`
pub async fn is_auth(_seller: RequireSeller) -> Json<Value> {
    Json(json!({ "success": true }))
}

/// `GET /api/seller/logout`
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<Value>) {
    (
        jar.add(removal_cookie(state.config(), SELLER_COOKIE)),
        Json(json!({ "success": true, "message": "Logged Out" })),
    )
}
