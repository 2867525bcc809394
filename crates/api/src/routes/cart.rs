//! Cart route handlers.
//!
//! Every route requires a bearer token; the cart is always the caller's own.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection, rejection::PathRejection},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use plated_core::{CartLineId, ProductId};

use crate::error::AppError;
use crate::middleware::RequireAuth;
use crate::models::{CartDetail, CartLine};
use crate::state::AppState;

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub food_item_id: ProductId,
    /// Defaults to 1 when omitted.
    #[serde(default)]
    pub quantity: Option<i64>,
}

/// Quantity update request body.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

/// The caller's cart with lines and products.
#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartDetail>, AppError> {
    let cart = state.cart_service().get_cart(user.id).await?;
    Ok(Json(cart))
}

/// Add a product, merging into an existing line.
#[instrument(skip_all)]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    payload: Result<Json<AddToCartRequest>, JsonRejection>,
) -> Result<Json<CartLine>, AppError> {
    let Json(body) = payload?;
    let line = state
        .cart_service()
        .add_item(user.id, body.food_item_id, body.quantity.unwrap_or(1))
        .await?;

    Ok(Json(line))
}

/// Overwrite a line's quantity.
#[instrument(skip_all)]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    item_id: Result<Path<CartLineId>, PathRejection>,
    payload: Result<Json<UpdateQuantityRequest>, JsonRejection>,
) -> Result<Json<CartLine>, AppError> {
    let Path(item_id) = item_id?;
    let Json(body) = payload?;
    let line = state
        .cart_service()
        .update_line_quantity(user.id, item_id, body.quantity)
        .await?;

    Ok(Json(line))
}

/// Remove a line.
#[instrument(skip_all)]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    item_id: Result<Path<CartLineId>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path(item_id) = item_id?;
    state.cart_service().remove_line(user.id, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
