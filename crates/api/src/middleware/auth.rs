//! Authentication extractors and session cookie helpers.
//!
//! Shoppers are identified by the `token` cookie and the seller by the
//! `sellerToken` cookie. Both hold signed tokens issued by
//! [`TokenService`](crate::services::auth::TokenService).

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::Span;

use greenbasket_core::UserId;

use crate::config::ApiConfig;
use crate::error::AppError;
use crate::services::auth::{AuthError, TokenError};
use crate::state::AppState;

/// Cookie carrying the shopper token.
pub const USER_COOKIE: &str = "token";
/// Cookie carrying the seller token.
pub const SELLER_COOKIE: &str = "sellerToken";

const NOT_AUTHORIZED: &str = "Not Authorized";

/// Extractor that requires a signed-in shopper.
///
/// Rejects with 401 when the cookie is missing or the token does not verify.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireUser(user_id): RequireUser) -> impl IntoResponse {
///     format!("Hello, user {user_id}!")
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequireUser(pub UserId);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(USER_COOKIE)
            .ok_or(AuthError::Token(TokenError::Missing))?;

        let claims = state
            .tokens()
            .verify_user(token.value())
            .map_err(AuthError::from)?;

        Span::current().record("user_id", claims.id.as_i32());
        Ok(Self(claims.id))
    }
}

/// Extractor that requires the seller.
///
/// Rejects with 401 when the cookie is missing or the token does not verify,
/// and with 403 when the token names an email other than the configured
/// seller.
#[derive(Debug, Clone, Copy)]
pub struct RequireSeller;

impl FromRequestParts<AppState> for RequireSeller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(SELLER_COOKIE)
            .ok_or_else(|| AppError::Unauthorized(NOT_AUTHORIZED.to_string()))?;

        let claims = state
            .tokens()
            .verify_seller(token.value())
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

        if claims.email != state.config().seller.email.as_str() {
            tracing::warn!("Seller token presented for a non-seller email");
            return Err(AppError::Forbidden(NOT_AUTHORIZED.to_string()));
        }

        Ok(Self)
    }
}

/// Build a session cookie holding `token`.
#[must_use]
pub fn session_cookie(
    config: &ApiConfig,
    name: &'static str,
    token: String,
    max_age: chrono::Duration,
) -> Cookie<'static> {
    let secure = config.secure_cookies();
    Cookie::build((name, token))
        .http_only(true)
        .path("/")
        .secure(secure)
        .same_site(if secure { SameSite::None } else { SameSite::Strict })
        .max_age(time::Duration::seconds(max_age.num_seconds()))
        .build()
}

/// Build an expired cookie for `name`, matching the attributes it was set
/// with. Add it to the jar so it is sent even when the request lacked it.
#[must_use]
pub fn removal_cookie(config: &ApiConfig, name: &'static str) -> Cookie<'static> {
    let secure = config.secure_cookies();
    let mut cookie = Cookie::build(name)
        .http_only(true)
        .path("/")
        .secure(secure)
        .same_site(if secure { SameSite::None } else { SameSite::Strict })
        .build();
    cookie.make_removal();
    cookie
}
