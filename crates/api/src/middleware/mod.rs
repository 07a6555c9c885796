//! HTTP middleware stack for the API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS (credentialed requests from the client origin)
//! 5. Rate limiting on login routes (governor)

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::{
    RequireSeller, RequireUser, SELLER_COOKIE, USER_COOKIE, removal_cookie, session_cookie,
};
pub use rate_limit::login_rate_limiter;
pub use request_id::request_id_middleware;
