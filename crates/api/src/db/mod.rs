//! Database operations for the `PostgreSQL` store.
//!
//! ## Tables
//!
//! - `food_items` - Catalog products
//! - `shopping_carts` - One cart per user (`user_id` is unique)
//! - `cart_items` - Cart lines, unique per `(cart_id, food_item_id)`
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p plated-cli -- migrate
//! ```
//!
//! Queries are built at runtime with `sqlx::query_as` so the crate compiles
//! without a reachable database.

pub mod carts;
pub mod products;

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use carts::{CartRepository, PgCartRepository};
pub use products::{CatalogRepository, PgCatalogRepository};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// A referenced entity does not exist.
    #[error("not found")]
    NotFound,

    /// Merging would push a line quantity past what the column holds.
    #[error("line quantity would exceed the maximum")]
    QuantityOverflow,

    /// Constraint violation (e.g., duplicate cart for a user).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Classify a write error, turning foreign-key violations into `NotFound`.
    pub(crate) fn from_write(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_foreign_key_violation()
        {
            return Self::NotFound;
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
