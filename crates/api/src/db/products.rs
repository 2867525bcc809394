//! Catalog repository for `food_items`.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use plated_core::ProductId;

use super::RepositoryError;
use crate::models::{NewProduct, Product, ProductChanges};

/// Persistence operations for catalog products.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// List every product, newest first.
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError>;

    /// Insert a product and return it as stored.
    async fn insert_product(&self, product: NewProduct) -> Result<Product, RepositoryError>;

    /// Apply a partial update and bump `updated_at`.
    ///
    /// Returns `None` when no product has this ID.
    async fn update_product(
        &self,
        id: ProductId,
        changes: ProductChanges,
    ) -> Result<Option<Product>, RepositoryError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

const PRODUCT_COLUMNS: &str =
    "id, name, description, price, category, image_url, created_at, updated_at";

/// `PostgreSQL`-backed [`CatalogRepository`].
#[derive(Clone)]
pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM food_items ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    #[instrument(skip(self, product), fields(name = %product.name))]
    async fn insert_product(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            r"
            INSERT INTO food_items (name, description, price, category, image_url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(product.name)
        .bind(product.description)
        .bind(product.price)
        .bind(product.category)
        .bind(product.image_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(product)
    }

    #[instrument(skip(self, changes), fields(id = %id))]
    async fn update_product(
        &self,
        id: ProductId,
        changes: ProductChanges,
    ) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            r"
            UPDATE food_items
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                category = COALESCE($5, category),
                image_url = COALESCE($6, image_url),
                updated_at = now()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(changes.name)
        .bind(changes.description)
        .bind(changes.price)
        .bind(changes.category)
        .bind(changes.image_url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
