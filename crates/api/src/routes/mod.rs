//! HTTP route handlers for the GreenBasket API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                  - Liveness check
//! GET  /health/ready            - Readiness check (database)
//!
//! # Users
//! POST /api/user/register       - Create account, set `token` cookie
//! POST /api/user/login          - Log in, set `token` cookie
//! GET  /api/user/is-auth        - Current user with cart (user)
//! GET  /api/user/logout         - Clear `token` cookie
//!
//! # Seller
//! POST /api/seller/login        - Log in, set `sellerToken` cookie
//! GET  /api/seller/is-auth      - Seller check (seller)
//! GET  /api/seller/logout       - Clear `sellerToken` cookie
//!
//! # Products
//! GET  /api/product/list        - All products, newest first
//! GET  /api/product/best-sellers - First in-stock products
//! POST /api/product/id          - One product by id
//! POST /api/product/add         - Create product, multipart (seller)
//! POST /api/product/stock       - Change stock flag (seller)
//!
//! # Cart / addresses / orders (user unless noted)
//! POST /api/cart/update         - Overwrite stored cart
//! POST /api/address/add         - Add shipping address
//! GET  /api/address/get         - List shipping addresses
//! POST /api/order/cod           - Place cash-on-delivery order
//! POST /api/order/stripe        - Place online order, returns checkout URL
//! GET  /api/order/user          - Own orders
//! GET  /api/order/seller        - All orders (seller)
//!
//! # Payment gateway
//! POST /stripe                  - Signed webhook
//!
//! GET  /uploads/*               - Uploaded product images
//! ```

pub mod address;
pub mod cart;
pub mod order;
pub mod product;
pub mod seller;
pub mod user;
pub mod webhook;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::from_fn,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::{login_rate_limiter, request_id_middleware};
use crate::state::AppState;

/// Maximum request body for product uploads (images included).
const UPLOAD_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Build the full application router with its middleware stack.
pub fn app(state: AppState) -> Router {
    let config = state.config();
    let uploads = ServeDir::new(&config.upload_dir);
    let cors = cors_layer(&config.client_url);
    let rate_limit = config.rate_limit;

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/user", user_routes(rate_limit))
        .nest("/api/seller", seller_routes(rate_limit))
        .nest("/api/product", product_routes())
        .nest("/api/cart", cart_routes())
        .nest("/api/address", address_routes())
        .nest("/api/order", order_routes())
        .route("/stripe", post(webhook::stripe_webhook))
        .nest_service(product::UPLOADS_PATH, uploads)
        .layer(cors)
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Create the user routes router.
pub fn user_routes(rate_limit: bool) -> Router<AppState> {
    let credentials = Router::new()
        .route("/register", post(user::register))
        .route("/login", post(user::login));

    Router::new()
        .merge(limited(credentials, rate_limit))
        .route("/is-auth", get(user::is_auth))
        .route("/logout", get(user::logout))
}

/// Create the seller routes router.
pub fn seller_routes(rate_limit: bool) -> Router<AppState> {
    let credentials = Router::new().route("/login", post(seller::login));

    Router::new()
        .merge(limited(credentials, rate_limit))
        .route("/is-auth", get(seller::is_auth))
        .route("/logout", get(seller::logout))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/list", get(product::list))
        .route("/best-sellers", get(product::best_seller_list))
        .route("/id", post(product::by_id))
        .route(
            "/add",
            post(product::add).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/stock", post(product::change_stock))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new().route("/update", post(cart::update))
}

/// Create the address routes router.
pub fn address_routes() -> Router<AppState> {
    Router::new()
        .route("/add", post(address::add))
        .route("/get", get(address::get))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/cod", post(order::place_cod))
        .route("/stripe", post(order::place_online))
        .route("/user", get(order::user_orders))
        .route("/seller", get(order::all_orders))
}

fn limited(router: Router<AppState>, rate_limit: bool) -> Router<AppState> {
    if rate_limit {
        router.route_layer(login_rate_limiter())
    } else {
        router
    }
}

/// Credentialed CORS for the storefront origin.
fn cors_layer(client_url: &str) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    match HeaderValue::from_str(client_url.trim_end_matches('/')) {
        Ok(origin) => base.allow_origin(origin),
        Err(e) => {
            tracing::warn!(%client_url, error = %e, "CLIENT_URL is not a valid origin; CORS disabled");
            base
        }
    }
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
