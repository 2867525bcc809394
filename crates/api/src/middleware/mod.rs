//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, capture errors)
//! 2. Catch panic (JSON 500 instead of a dropped connection)
//! 3. CORS (configured origins, credentials allowed)
//! 4. `TraceLayer` (request span with method, path, status, latency)
//! 5. Request ID (recorded in the span, echoed in the response)
//! 6. Rate limiting per route group (governor)

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::{BearerToken, RequireAuth};
pub use rate_limit::{api_rate_limiter, auth_rate_limiter};
pub use request_id::request_id_middleware;
