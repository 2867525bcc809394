//! Catalog product domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use plated_core::{Price, ProductId};

/// A catalog entry (a row of `food_items`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Unit price.
    pub price: Price,
    /// Menu category (e.g. "pizza", "dessert").
    pub category: Option<String>,
    /// Public URL of the product image.
    pub image_url: Option<String>,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A validated product ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Price,
    pub category: Option<String>,
    pub image_url: String,
}

/// A partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Price>,
    pub category: Option<String>,
    pub image_url: Option<String>,
}
