//! Shopper account routes.

use axum::{Json, extract::State};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument};

use crate::db::users::UserRepository;
use crate::error::{ApiJson, AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireUser, USER_COOKIE, removal_cookie, session_cookie};
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// `POST /api/user/register`
#[instrument(skip(state, jar, body))]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<(CookieJar, Json<Value>)> {
    let user = AuthService::new(state.pool())
        .register(&body.name, &body.email, &body.password)
        .await?;

    let token = state.tokens().issue_user(user.id).map_err(AuthError::from)?;
    let cookie = session_cookie(state.config(), USER_COOKIE, token, state.tokens().validity());

    set_sentry_user(&user.id, Some(user.email.as_str()));
    info!(user_id = %user.id, "User registered");

    Ok((
        jar.add(cookie),
        Json(json!({ "success": true, "user": user })),
    ))
}

/// `POST /api/user/login`
#[instrument(skip(state, jar, body))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<(CookieJar, Json<Value>)> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    let user = AuthService::new(state.pool())
        .login(&body.email, &body.password)
        .await?;

    let token = state.tokens().issue_user(user.id).map_err(AuthError::from)?;
    let cookie = session_cookie(state.config(), USER_COOKIE, token, state.tokens().validity());

    set_sentry_user(&user.id, Some(user.email.as_str()));
    info!(user_id = %user.id, "User logged in");

    Ok((
        jar.add(cookie),
        Json(json!({ "success": true, "user": user })),
    ))
}

/// `GET /api/user/is-auth`
///
/// Returns the signed-in user together with their stored cart.
#[instrument(skip(state))]
pub async fn is_auth(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
) -> Result<Json<Value>> {
    let user = UserRepository::new(state.pool())
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(json!({ "success": true, "user": user })))
}

/// `GET /api/user/logout`
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<Value>) {
    clear_sentry_user();
    (
        jar.add(removal_cookie(state.config(), USER_COOKIE)),
        Json(json!({ "success": true, "message": "Logged Out" })),
    )
}
