//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                    - Liveness check
//! GET    /health/ready              - Readiness check (database)
//!
//! # Auth (rate limited)
//! POST   /api/auth/register         - Create an account
//! POST   /api/auth/login            - Sign in, returns a session
//! GET    /api/auth/user             - Current user (bearer token)
//! POST   /api/auth/logout           - Revoke the session (bearer token)
//!
//! # Catalog
//! GET    /api/food                  - List products, newest first
//! POST   /api/food                  - Create (multipart, image required)
//! PUT    /api/food/{id}             - Partial update (multipart, image optional)
//!
//! # Cart (bearer token)
//! GET    /api/cart                  - Cart with lines and products
//! POST   /api/cart/add              - Add a product, merging quantities
//! PUT    /api/cart/update/{item_id} - Set a line's quantity
//! DELETE /api/cart/remove/{item_id} - Remove a line
//! ```

pub mod auth;
pub mod cart;
pub mod food;
pub mod health;

use std::any::Any;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, Method, StatusCode, header},
    middleware::from_fn,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde_json::json;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultOnResponse, OnResponse, TraceLayer},
};
use tracing::Span;

use crate::error::AppError;
use crate::middleware::{
    api_rate_limiter, auth_rate_limiter, request_id::REQUEST_ID_HEADER, request_id_middleware,
};
use crate::state::AppState;

/// Room for form fields and multipart framing on top of the image itself.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/user", get(auth::user))
        .route("/logout", post(auth::logout))
        .layer(auth_rate_limiter())
}

/// Create the catalog routes router.
pub fn food_routes(max_image_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(food::index).post(food::create))
        .route("/{id}", put(food::update))
        .layer(DefaultBodyLimit::max(
            max_image_bytes.saturating_add(FORM_OVERHEAD_BYTES),
        ))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update/{item_id}", put(cart::update))
        .route("/remove/{item_id}", delete(cart::remove))
}

/// Create all `/api` routes.
pub fn api_routes(max_image_bytes: usize) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .nest(
            "/food",
            food_routes(max_image_bytes).layer(api_rate_limiter()),
        )
        .nest("/cart", cart_routes().layer(api_rate_limiter()))
}

/// Build the full application: routes, fallback and the shared middleware
/// stack. Sentry layers are added by the binary.
pub fn app(state: AppState) -> Router {
    let max_image_bytes = state.config().max_image_bytes;
    let cors = cors_layer(&state.config().cors_origins);

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api", api_routes(max_image_bytes))
        .fallback(not_found)
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
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .layer(cors)
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(state)
}

async fn not_found() -> AppError {
    AppError::NotFound("Route not found".to_owned())
}

fn panic_response(_panic: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("request handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Something went wrong!" })),
    )
        .into_response()
}

/// CORS for the configured browser origins, with credentials.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}
