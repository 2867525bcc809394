//! Cart domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use plated_core::{CartId, CartLineId, ProductId, Quantity, UserId};

use super::Product;

/// A user's cart. Each user owns at most one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Cart {
    /// Unique cart ID.
    pub id: CartId,
    /// Owner of the cart.
    pub user_id: UserId,
    /// When the cart was created.
    pub created_at: DateTime<Utc>,
}

/// One product in a cart. A cart holds at most one line per product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    /// Unique line ID.
    pub id: CartLineId,
    /// Cart this line belongs to.
    pub cart_id: CartId,
    /// Product referenced by this line.
    pub food_item_id: ProductId,
    /// Number of units, always positive.
    pub quantity: Quantity,
    /// When the line was created.
    pub created_at: DateTime<Utc>,
    /// When the quantity last changed.
    pub updated_at: DateTime<Utc>,
}

/// A cart line together with a snapshot of its product.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineDetail {
    #[serde(flatten)]
    pub line: CartLine,
    pub food_item: Product,
}

/// A cart with all of its lines, oldest line first.
#[derive(Debug, Clone, Serialize)]
pub struct CartDetail {
    #[serde(flatten)]
    pub cart: Cart,
    pub cart_items: Vec<CartLineDetail>,
}

/// How an upsert treats an existing line for the same product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityChange {
    /// Add to the existing quantity (the "add to cart" merge).
    Increment(Quantity),
    /// Overwrite the existing quantity.
    Set(Quantity),
}

impl QuantityChange {
    /// The quantity carried by the change.
    #[must_use]
    pub const fn quantity(self) -> Quantity {
        match self {
            Self::Increment(q) | Self::Set(q) => q,
        }
    }
}

/// Result of an upsert: the line as stored, and whether it was newly created.
#[derive(Debug, Clone)]
pub struct LineUpsert {
    pub line: CartLine,
    pub created: bool,
}
