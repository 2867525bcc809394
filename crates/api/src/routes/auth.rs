//! Auth route handlers.
//!
//! Thin JSON wrappers over [`crate::services::AuthService`]. Successful
//! sign-in returns the provider session; clients send its `access_token` as
//! a bearer credential on subsequent requests.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::{AppError, clear_sentry_user};
use crate::middleware::{BearerToken, RequireAuth};
use crate::models::{AuthSession, Identity, Registration};
use crate::state::AppState;

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Create an account.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Registration>), AppError> {
    let Json(body) = payload?;
    let registration = state
        .auth_service()
        .register(&body.email, body.password, body.username, body.role)
        .await?;

    Ok((StatusCode::CREATED, Json(registration)))
}

/// Sign in with email and password.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthSession>, AppError> {
    let Json(body) = payload?;
    let session = state
        .auth_service()
        .login(&body.email, body.password)
        .await?;

    Ok(Json(session))
}

/// The authenticated caller.
pub async fn user(RequireAuth(identity): RequireAuth) -> Json<Identity> {
    Json(identity)
}

/// Revoke the caller's session.
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<Json<serde_json::Value>, AppError> {
    state.auth_service().logout(&token).await?;
    clear_sentry_user();

    Ok(Json(serde_json::json!({ "message": "Logged out successfully" })))
}
