//! Cart service.
//!
//! Each user has exactly one cart, created on first add. Adding a product
//! already in the cart merges into its line instead of creating a second one.
//! Line-level operations only ever see lines of the caller's own cart: a line
//! belonging to someone else is reported as not found.

mod error;

pub use error::CartError;

use tracing::{debug, instrument};

use plated_core::{CartLineId, ProductId, Quantity, QuantityError, UserId};

use crate::db::{CartRepository, RepositoryError};
use crate::models::{Cart, CartDetail, CartLine, QuantityChange};

/// Cart service.
pub struct CartService<'a> {
    carts: &'a dyn CartRepository,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(carts: &'a dyn CartRepository) -> Self {
        Self { carts }
    }

    /// The owner's cart with every line and its product.
    ///
    /// # Errors
    ///
    /// Returns `CartError::CartNotFound` if the owner has never added anything.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn get_cart(&self, owner: UserId) -> Result<CartDetail, CartError> {
        self.carts
            .get_cart_with_lines(owner)
            .await?
            .ok_or(CartError::CartNotFound)
    }

    /// Add `quantity` units of a product, creating the cart on first use.
    ///
    /// If the cart already holds the product its line is incremented in a
    /// single atomic step.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for non-positive quantities, or
    /// when the merged quantity would exceed [`Quantity::MAX`].
    /// Returns `CartError::ProductNotFound` if the product does not exist.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn add_item(
        &self,
        owner: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartLine, CartError> {
        let quantity = Quantity::new(quantity)?;
        let cart = self.carts.get_or_create_cart(owner).await?;

        let upsert = match self
            .carts
            .upsert_line_quantity(cart.id, product_id, QuantityChange::Increment(quantity))
            .await
        {
            Ok(upsert) => upsert,
            Err(RepositoryError::NotFound) => return Err(CartError::ProductNotFound),
            Err(RepositoryError::QuantityOverflow) => {
                let current = self
                    .carts
                    .find_line(cart.id, product_id)
                    .await?
                    .map_or(0, |line| i64::from(line.quantity.get()));
                return Err(QuantityError::TooLarge {
                    max: Quantity::MAX,
                    got: current + i64::from(quantity.get()),
                }
                .into());
            }
            Err(e) => return Err(e.into()),
        };

        if upsert.created {
            debug!(line_id = %upsert.line.id, "new cart line");
        } else {
            debug!(line_id = %upsert.line.id, quantity = %upsert.line.quantity, "merged into existing line");
        }

        Ok(upsert.line)
    }

    /// Overwrite the quantity of one of the owner's lines.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for non-positive quantities.
    /// Returns `CartError::LineNotFound` if the line is not in the owner's cart.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn update_line_quantity(
        &self,
        owner: UserId,
        line_id: CartLineId,
        quantity: i64,
    ) -> Result<CartLine, CartError> {
        let quantity = Quantity::new(quantity)?;
        let cart = self.owned_cart(owner).await?;

        self.carts
            .set_line_quantity(cart.id, line_id, quantity)
            .await?
            .ok_or(CartError::LineNotFound)
    }

    /// Remove one of the owner's lines.
    ///
    /// # Errors
    ///
    /// Returns `CartError::LineNotFound` if the line is not in the owner's
    /// cart, including when it was already removed.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn remove_line(&self, owner: UserId, line_id: CartLineId) -> Result<(), CartError> {
        let cart = self.owned_cart(owner).await?;

        if self.carts.delete_line(cart.id, line_id).await? {
            debug!(line_id = %line_id, "line removed");
            Ok(())
        } else {
            Err(CartError::LineNotFound)
        }
    }

    /// The owner's cart for line-level operations. An owner without a cart
    /// cannot own the line either.
    async fn owned_cart(&self, owner: UserId) -> Result<Cart, CartError> {
        self.carts
            .get_cart(owner)
            .await?
            .ok_or(CartError::LineNotFound)
    }
}
