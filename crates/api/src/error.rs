//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Failures are rendered as
//! `{"error": "<message>"}` with a status chosen per error kind. Server-side
//! failures are captured to Sentry and answered with a generic message so
//! store or gateway details never reach the client.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::identity::IdentityError;
use crate::services::{AuthError, CartError, CatalogError};

/// Message sent for every 5xx response.
const INTERNAL_MESSAGE: &str = "Internal server error";

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Identity provider lookup failed.
    #[error("Identity provider error: {0}")]
    Identity(#[from] IdentityError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Catalog operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Status code and client-facing message.
    fn classify(&self) -> (StatusCode, String) {
        match self {
            Self::Database(_) | Self::Identity(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_owned())
            }
            Self::Auth(err) => match err {
                AuthError::InvalidEmail(e) => {
                    (StatusCode::BAD_REQUEST, format!("Invalid email: {e}"))
                }
                AuthError::MissingPassword => {
                    (StatusCode::BAD_REQUEST, "Password is required".to_owned())
                }
                AuthError::InvalidCredentials => (
                    StatusCode::UNAUTHORIZED,
                    "Invalid login credentials".to_owned(),
                ),
                AuthError::Rejected(message) => (StatusCode::BAD_REQUEST, message.clone()),
                AuthError::Provider(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_owned())
                }
            },
            Self::Cart(err) => match err {
                CartError::InvalidQuantity(e) => (StatusCode::BAD_REQUEST, capitalize(&e.to_string())),
                CartError::CartNotFound => (StatusCode::NOT_FOUND, "Cart not found".to_owned()),
                CartError::LineNotFound => {
                    (StatusCode::NOT_FOUND, "Cart item not found".to_owned())
                }
                CartError::ProductNotFound => {
                    (StatusCode::NOT_FOUND, "Food item not found".to_owned())
                }
                CartError::Repository(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_owned())
                }
            },
            Self::Catalog(err) => match err {
                CatalogError::MissingImage => {
                    (StatusCode::BAD_REQUEST, "No image file provided".to_owned())
                }
                CatalogError::InvalidFileType(_) => (
                    StatusCode::BAD_REQUEST,
                    "Only image files are allowed".to_owned(),
                ),
                CatalogError::PayloadTooLarge { limit } => (
                    StatusCode::PAYLOAD_TOO_LARGE,
                    format!("File size too large. Maximum {} allowed.", format_size(*limit)),
                ),
                CatalogError::MissingField(field) => {
                    (StatusCode::BAD_REQUEST, capitalize(&format!("{field} is required")))
                }
                CatalogError::InvalidPrice(e) => {
                    (StatusCode::BAD_REQUEST, capitalize(&e.to_string()))
                }
                CatalogError::AssetKeyCollision(_) => (
                    StatusCode::BAD_REQUEST,
                    "File with this name already exists".to_owned(),
                ),
                CatalogError::NotFound(_) => {
                    (StatusCode::NOT_FOUND, "Food item not found".to_owned())
                }
                CatalogError::AssetStore(_) | CatalogError::Repository(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_owned())
                }
            },
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
            Self::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message.clone()),
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.classify();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Human-readable byte count, in whole MB when exact.
fn format_size(bytes: usize) -> String {
    const MIB: usize = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        format!("{bytes} bytes")
    }
}
