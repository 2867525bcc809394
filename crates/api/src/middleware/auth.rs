//! Authentication extractors.
//!
//! Callers authenticate with `Authorization: Bearer <access token>`. The token
//! is resolved through [`crate::identity::IdentityResolver`]; the API holds no
//! session state of its own.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::{AppError, set_sentry_user};
use crate::models::Identity;
use crate::state::AppState;

/// Extractor for the raw bearer token.
///
/// Rejects with 401 when the header is missing or not a bearer credential.
pub struct BearerToken(pub String);

impl FromRequestParts<AppState> for BearerToken {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_bearer)
            .map(|token| Self(token.to_owned()))
            .ok_or_else(|| AppError::Unauthorized("Access token required".to_owned()))
    }
}

/// Extractor that requires an authenticated user.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     Json(user)
/// }
/// ```
pub struct RequireAuth(pub Identity);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;

        let identity = state
            .identity()
            .resolve(&token)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".to_owned()))?;

        set_sentry_user(&identity.id, identity.email.as_deref());
        tracing::Span::current().record("user_id", tracing::field::display(identity.id));

        Ok(Self(identity))
    }
}

/// Extract the token from an `Authorization` value. The scheme is
/// case-insensitive; an empty token is rejected.
fn parse_bearer(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
