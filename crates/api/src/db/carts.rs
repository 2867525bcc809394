//! Cart repository.
//!
//! Line merges are a single `INSERT ... ON CONFLICT DO UPDATE`, so concurrent
//! adds of the same product for one user never produce duplicate lines or lose
//! an increment.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, instrument};

use plated_core::{CartId, CartLineId, Price, ProductId, Quantity, UserId};

use super::RepositoryError;
use crate::models::{
    Cart, CartDetail, CartLine, CartLineDetail, LineUpsert, Product, QuantityChange,
};

/// Persistence operations for carts and their lines.
///
/// Every line-level operation is scoped by `cart_id`, so callers that resolved
/// the cart from the authenticated owner cannot touch another user's lines.
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Fetch the owner's cart without creating it.
    async fn get_cart(&self, owner: UserId) -> Result<Option<Cart>, RepositoryError>;

    /// Fetch the owner's cart with every line and its product.
    async fn get_cart_with_lines(
        &self,
        owner: UserId,
    ) -> Result<Option<CartDetail>, RepositoryError>;

    /// Fetch the owner's cart, creating it on first use.
    ///
    /// Idempotent under concurrency: at most one cart ever exists per owner.
    async fn get_or_create_cart(&self, owner: UserId) -> Result<Cart, RepositoryError>;

    /// Find the line for `product_id` in `cart_id`, if any.
    async fn find_line(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartLine>, RepositoryError>;

    /// Insert a line or change the existing one for the same product.
    ///
    /// Returns `RepositoryError::NotFound` when the product does not exist.
    async fn upsert_line_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        change: QuantityChange,
    ) -> Result<LineUpsert, RepositoryError>;

    /// Overwrite the quantity of a line in `cart_id`.
    ///
    /// Returns `None` when no such line exists in that cart.
    async fn set_line_quantity(
        &self,
        cart_id: CartId,
        line_id: CartLineId,
        quantity: Quantity,
    ) -> Result<Option<CartLine>, RepositoryError>;

    /// Delete a line in `cart_id`. Returns `false` when nothing was deleted.
    async fn delete_line(&self, cart_id: CartId, line_id: CartLineId)
    -> Result<bool, RepositoryError>;
}

const CART_COLUMNS: &str = "id, user_id, created_at";
const LINE_COLUMNS: &str = "id, cart_id, food_item_id, quantity, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct LineRow {
    id: CartLineId,
    cart_id: CartId,
    food_item_id: ProductId,
    quantity: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: LineRow) -> Result<Self, Self::Error> {
        let quantity = Quantity::new(i64::from(row.quantity)).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid quantity on line {}: {e}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            cart_id: row.cart_id,
            food_item_id: row.food_item_id,
            quantity,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UpsertRow {
    #[sqlx(flatten)]
    line: LineRow,
    inserted: bool,
}

#[derive(sqlx::FromRow)]
struct LineDetailRow {
    #[sqlx(flatten)]
    line: LineRow,
    product_name: String,
    product_description: Option<String>,
    product_price: Price,
    product_category: Option<String>,
    product_image_url: Option<String>,
    product_created_at: DateTime<Utc>,
    product_updated_at: DateTime<Utc>,
}

impl TryFrom<LineDetailRow> for CartLineDetail {
    type Error = RepositoryError;

    fn try_from(row: LineDetailRow) -> Result<Self, Self::Error> {
        let food_item = Product {
            id: row.line.food_item_id,
            name: row.product_name,
            description: row.product_description,
            price: row.product_price,
            category: row.product_category,
            image_url: row.product_image_url,
            created_at: row.product_created_at,
            updated_at: row.product_updated_at,
        };

        Ok(Self {
            line: row.line.try_into()?,
            food_item,
        })
    }
}

/// `PostgreSQL`-backed [`CartRepository`].
#[derive(Clone)]
pub struct PgCartRepository {
    pool: PgPool,
}

impl PgCartRepository {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CartRepository for PgCartRepository {
    async fn get_cart(&self, owner: UserId) -> Result<Option<Cart>, RepositoryError> {
        let cart = sqlx::query_as::<_, Cart>(&format!(
            "SELECT {CART_COLUMNS} FROM shopping_carts WHERE user_id = $1"
        ))
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;

        Ok(cart)
    }

    #[instrument(skip(self), fields(owner = %owner))]
    async fn get_cart_with_lines(
        &self,
        owner: UserId,
    ) -> Result<Option<CartDetail>, RepositoryError> {
        let Some(cart) = self.get_cart(owner).await? else {
            return Ok(None);
        };

        let rows = sqlx::query_as::<_, LineDetailRow>(
            r"
            SELECT ci.id, ci.cart_id, ci.food_item_id, ci.quantity,
                   ci.created_at, ci.updated_at,
                   fi.name AS product_name,
                   fi.description AS product_description,
                   fi.price AS product_price,
                   fi.category AS product_category,
                   fi.image_url AS product_image_url,
                   fi.created_at AS product_created_at,
                   fi.updated_at AS product_updated_at
            FROM cart_items ci
            JOIN food_items fi ON fi.id = ci.food_item_id
            WHERE ci.cart_id = $1
            ORDER BY ci.created_at, ci.id
            ",
        )
        .bind(cart.id)
        .fetch_all(&self.pool)
        .await?;

        let cart_items = rows
            .into_iter()
            .map(CartLineDetail::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(CartDetail { cart, cart_items }))
    }

    #[instrument(skip(self), fields(owner = %owner))]
    async fn get_or_create_cart(&self, owner: UserId) -> Result<Cart, RepositoryError> {
        if let Some(cart) = self.get_cart(owner).await? {
            return Ok(cart);
        }

        let inserted = sqlx::query_as::<_, Cart>(&format!(
            "INSERT INTO shopping_carts (user_id) VALUES ($1) RETURNING {CART_COLUMNS}"
        ))
        .bind(owner)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(cart) => {
                debug!(cart_id = %cart.id, "created cart");
                Ok(cart)
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                // Another request created it between our read and insert.
                debug!("cart created concurrently, re-reading");
                self.get_cart(owner).await?.ok_or_else(|| {
                    RepositoryError::Conflict(format!("cart for {owner} vanished after conflict"))
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_line(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartLine>, RepositoryError> {
        let row = sqlx::query_as::<_, LineRow>(&format!(
            "SELECT {LINE_COLUMNS} FROM cart_items WHERE cart_id = $1 AND food_item_id = $2"
        ))
        .bind(cart_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CartLine::try_from).transpose()
    }

    #[instrument(skip(self), fields(cart_id = %cart_id, product_id = %product_id))]
    async fn upsert_line_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        change: QuantityChange,
    ) -> Result<LineUpsert, RepositoryError> {
        // An increment that would overflow the INTEGER column matches no row
        // instead of raising "integer out of range".
        let (on_conflict, guard) = match change {
            QuantityChange::Increment(_) => (
                "cart_items.quantity + EXCLUDED.quantity",
                format!("WHERE cart_items.quantity <= {} - EXCLUDED.quantity", Quantity::MAX),
            ),
            QuantityChange::Set(_) => ("EXCLUDED.quantity", String::new()),
        };

        let row = sqlx::query_as::<_, UpsertRow>(&format!(
            r"
            INSERT INTO cart_items (cart_id, food_item_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (cart_id, food_item_id) DO UPDATE
            SET quantity = {on_conflict}, updated_at = now()
            {guard}
            RETURNING {LINE_COLUMNS}, (xmax = 0) AS inserted
            "
        ))
        .bind(cart_id)
        .bind(product_id)
        .bind(change.quantity().get())
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from_write)?
        .ok_or(RepositoryError::QuantityOverflow)?;

        Ok(LineUpsert {
            created: row.inserted,
            line: row.line.try_into()?,
        })
    }

    #[instrument(skip(self), fields(cart_id = %cart_id, line_id = %line_id))]
    async fn set_line_quantity(
        &self,
        cart_id: CartId,
        line_id: CartLineId,
        quantity: Quantity,
    ) -> Result<Option<CartLine>, RepositoryError> {
        let row = sqlx::query_as::<_, LineRow>(&format!(
            r"
            UPDATE cart_items
            SET quantity = $3, updated_at = now()
            WHERE id = $2 AND cart_id = $1
            RETURNING {LINE_COLUMNS}
            "
        ))
        .bind(cart_id)
        .bind(line_id)
        .bind(quantity.get())
        .fetch_optional(&self.pool)
        .await?;

        row.map(CartLine::try_from).transpose()
    }

    #[instrument(skip(self), fields(cart_id = %cart_id, line_id = %line_id))]
    async fn delete_line(
        &self,
        cart_id: CartId,
        line_id: CartLineId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $2 AND cart_id = $1")
            .bind(cart_id)
            .bind(line_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
