//! Catalog error types.

use thiserror::Error;

use plated_core::{PriceError, ProductId};

use crate::assets::AssetStoreError;
use crate::db::RepositoryError;

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A create request carried no image, or an empty one.
    #[error("no image file provided")]
    MissingImage,

    /// The uploaded file is not declared as an image.
    #[error("only image files are allowed (got {0:?})")]
    InvalidFileType(String),

    /// The uploaded file exceeds the configured limit.
    #[error("image exceeds the upload limit of {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// A required text field is missing or blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// The price is not a valid amount.
    #[error("invalid price: {0}")]
    InvalidPrice(#[from] PriceError),

    /// The generated image key was already taken.
    #[error("an image already exists under {0}")]
    AssetKeyCollision(String),

    /// No product has this ID.
    #[error("food item {0} not found")]
    NotFound(ProductId),

    /// The blob store failed.
    #[error("asset store error: {0}")]
    AssetStore(AssetStoreError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<AssetStoreError> for CatalogError {
    fn from(err: AssetStoreError) -> Self {
        match err {
            AssetStoreError::AlreadyExists(key) => Self::AssetKeyCollision(key),
            other => Self::AssetStore(other),
        }
    }
}
