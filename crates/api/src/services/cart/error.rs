//! Cart error types.

use thiserror::Error;

use plated_core::QuantityError;

use crate::db::RepositoryError;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Quantity is zero, negative or out of range.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(#[from] QuantityError),

    /// The caller has no cart yet.
    #[error("cart not found")]
    CartNotFound,

    /// No such line in the caller's cart.
    #[error("cart item not found")]
    LineNotFound,

    /// The referenced product does not exist.
    #[error("food item not found")]
    ProductNotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
