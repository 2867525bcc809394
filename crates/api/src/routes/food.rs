//! Catalog route handlers.
//!
//! Create and update take `multipart/form-data` with text fields `name`,
//! `description`, `price`, `category` and an optional file field `image`.

use axum::{
    Json,
    extract::{
        Multipart, Path, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::PathRejection,
    },
    http::StatusCode,
};
use tracing::instrument;

use plated_core::ProductId;

use crate::error::AppError;
use crate::models::Product;
use crate::services::{CatalogError, ImageUpload, ProductInput};
use crate::state::AppState;

/// Every product, newest first.
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Product>>, AppError> {
    let products = state.catalog_service().list().await?;
    Ok(Json(products))
}

/// Create a product with its image.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    let form = read_product_form(multipart, state.config().max_image_bytes).await?;
    let product = state
        .catalog_service()
        .create(form.input, form.image)
        .await?;

    Ok((StatusCode::CREATED, Json(product)))
}

/// Partially update a product, optionally replacing its image.
#[instrument(skip_all)]
pub async fn update(
    State(state): State<AppState>,
    id: Result<Path<ProductId>, PathRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Product>, AppError> {
    let Path(id) = id?;
    let form = read_product_form(multipart, state.config().max_image_bytes).await?;
    let product = state
        .catalog_service()
        .update(id, form.input, form.image)
        .await?;

    Ok(Json(product))
}

struct ProductForm {
    input: ProductInput,
    image: Option<ImageUpload>,
}

/// Drain the form, streaming the image with a running size check so an
/// oversized upload is rejected without buffering all of it.
async fn read_product_form(
    multipart: Result<Multipart, MultipartRejection>,
    max_image_bytes: usize,
) -> Result<ProductForm, AppError> {
    let mut multipart =
        multipart.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let too_large = || AppError::from(CatalogError::PayloadTooLarge {
        limit: max_image_bytes,
    });
    let field_error = |err: MultipartError| {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            too_large()
        } else {
            AppError::BadRequest(err.body_text())
        }
    };

    let mut input = ProductInput::default();
    let mut image = None;

    while let Some(mut field) = multipart.next_field().await.map_err(field_error)? {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "image" => {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let content_type = field.content_type().unwrap_or_default().to_owned();

                let mut bytes = Vec::new();
                while let Some(chunk) = field.chunk().await.map_err(field_error)? {
                    if bytes.len() + chunk.len() > max_image_bytes {
                        return Err(too_large());
                    }
                    bytes.extend_from_slice(&chunk);
                }

                // A browser submits an untouched file input as an empty,
                // unnamed part.
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                image = Some(ImageUpload {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            "name" => input.name = Some(field.text().await.map_err(field_error)?),
            "description" => input.description = Some(field.text().await.map_err(field_error)?),
            "price" => input.price = Some(field.text().await.map_err(field_error)?),
            "category" => input.category = Some(field.text().await.map_err(field_error)?),
            _ => {}
        }
    }

    Ok(ProductForm { input, image })
}
