//! Catalog service.
//!
//! Creating or re-imaging a product is a two-step write: the image goes to
//! the blob store first, then the row is written with the image's public
//! URL. Every input check runs before the upload, so a rejected request
//! leaves both stores untouched. If the row write fails after a successful
//! upload the image is left behind; its key is logged as
//! `orphaned_asset_key` for cleanup.

mod error;

pub use error::CatalogError;

use tracing::{info, instrument, warn};

use plated_core::{Price, ProductId};

use crate::assets::{AssetKey, AssetStore};
use crate::db::CatalogRepository;
use crate::models::{NewProduct, Product, ProductChanges};

/// An image received with a create or update request.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Raw product fields as submitted. Blank values count as absent.
#[derive(Debug, Clone, Default)]
pub struct ProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub category: Option<String>,
}

/// Catalog service.
pub struct CatalogService<'a> {
    catalog: &'a dyn CatalogRepository,
    assets: &'a dyn AssetStore,
    max_image_bytes: usize,
}

impl<'a> CatalogService<'a> {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(
        catalog: &'a dyn CatalogRepository,
        assets: &'a dyn AssetStore,
        max_image_bytes: usize,
    ) -> Self {
        Self {
            catalog,
            assets,
            max_image_bytes,
        }
    }

    /// Every product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn list(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.catalog.list_products().await?)
    }

    /// Create a product with its image.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::MissingImage`, `InvalidFileType`,
    /// `PayloadTooLarge`, `MissingField` or `InvalidPrice` for bad input,
    /// before anything is written.
    /// Returns `CatalogError::AssetKeyCollision` if the generated key is taken.
    #[instrument(skip_all)]
    pub async fn create(
        &self,
        input: ProductInput,
        image: Option<ImageUpload>,
    ) -> Result<Product, CatalogError> {
        let image = image.ok_or(CatalogError::MissingImage)?;
        self.validate_image(&image)?;

        let name = non_blank(input.name).ok_or(CatalogError::MissingField("name"))?;
        let price = non_blank(input.price).ok_or(CatalogError::MissingField("price"))?;
        let price = Price::parse(&price)?;

        let (key, image_url) = self.store_image(image).await?;

        let product = NewProduct {
            name,
            description: non_blank(input.description),
            price,
            category: non_blank(input.category),
            image_url,
        };

        match self.catalog.insert_product(product).await {
            Ok(product) => {
                info!(product_id = %product.id, "food item created");
                Ok(product)
            }
            Err(e) => {
                warn!(orphaned_asset_key = %key, error = %e, "insert failed after image upload");
                Err(e.into())
            }
        }
    }

    /// Apply a partial update, optionally replacing the image.
    ///
    /// Fields left out keep their stored values. The previous image object is
    /// not deleted.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if no product has this ID.
    /// Returns the same validation errors as [`Self::create`] for a bad image
    /// or price.
    #[instrument(skip(self, input, image), fields(id = %id))]
    pub async fn update(
        &self,
        id: ProductId,
        input: ProductInput,
        image: Option<ImageUpload>,
    ) -> Result<Product, CatalogError> {
        if let Some(ref image) = image {
            self.validate_image(image)?;
        }
        if matches!(&input.name, Some(name) if name.trim().is_empty()) {
            return Err(CatalogError::MissingField("name"));
        }
        let price = non_blank(input.price)
            .map(|raw| Price::parse(&raw))
            .transpose()?;

        let uploaded = match image {
            Some(image) => Some(self.store_image(image).await?),
            None => None,
        };

        let changes = ProductChanges {
            name: non_blank(input.name),
            description: non_blank(input.description),
            price,
            category: non_blank(input.category),
            image_url: uploaded.as_ref().map(|(_, url)| url.clone()),
        };

        let result = self.catalog.update_product(id, changes).await;
        if let (Some((key, _)), Ok(None) | Err(_)) = (&uploaded, &result) {
            warn!(orphaned_asset_key = %key, "update failed after image upload");
        }

        let product = result?.ok_or(CatalogError::NotFound(id))?;
        info!(product_id = %product.id, "food item updated");
        Ok(product)
    }

    fn validate_image(&self, image: &ImageUpload) -> Result<(), CatalogError> {
        if !is_image_type(&image.content_type) {
            return Err(CatalogError::InvalidFileType(image.content_type.clone()));
        }
        if image.bytes.is_empty() {
            return Err(CatalogError::MissingImage);
        }
        if image.bytes.len() > self.max_image_bytes {
            return Err(CatalogError::PayloadTooLarge {
                limit: self.max_image_bytes,
            });
        }
        Ok(())
    }

    async fn store_image(&self, image: ImageUpload) -> Result<(AssetKey, String), CatalogError> {
        let key = AssetKey::generate(&image.file_name, &image.content_type);
        self.assets
            .upload(&key, image.bytes, &image.content_type)
            .await?;
        let url = self.assets.public_url(&key);
        Ok((key, url))
    }
}

fn is_image_type(content_type: &str) -> bool {
    content_type
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{MemoryAssets, MemoryStore, png};

    const LIMIT: usize = 5 * 1024 * 1024;

    fn input(name: &str, price: &str) -> ProductInput {
        ProductInput {
            name: Some(name.to_owned()),
            description: Some("Tasty".to_owned()),
            price: Some(price.to_owned()),
            category: Some("mains".to_owned()),
        }
    }

    #[tokio::test]
    async fn test_create_uploads_then_inserts() {
        let store = MemoryStore::new();
        let assets = MemoryAssets::new();
        let service = CatalogService::new(&store, &assets, LIMIT);

        let product = service
            .create(input("Ramen", "11.00"), Some(png("ramen.png", 64)))
            .await
            .unwrap();

        let uploads = assets.uploads();
        assert_eq!(uploads.len(), 1);
        assert!(uploads[0].starts_with("food-images/"));
        assert!(uploads[0].ends_with(".png"));
        assert_eq!(
            product.image_url.as_deref(),
            Some(format!("https://assets.test/{}", uploads[0]).as_str())
        );
        assert_eq!(product.price.to_string(), "11.00");
        assert_eq!(store.product_count(), 1);
    }

    #[tokio::test]
    async fn test_create_requires_image() {
        let store = MemoryStore::new();
        let assets = MemoryAssets::new();
        let service = CatalogService::new(&store, &assets, LIMIT);

        let err = service.create(input("Ramen", "11"), None).await.unwrap_err();
        assert!(matches!(err, CatalogError::MissingImage));

        let err = service
            .create(input("Ramen", "11"), Some(png("empty.png", 0)))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::MissingImage));
        assert_eq!(store.product_count(), 0);
    }

    #[tokio::test]
    async fn test_non_image_writes_nothing() {
        let store = MemoryStore::new();
        let assets = MemoryAssets::new();
        let service = CatalogService::new(&store, &assets, LIMIT);

        let pdf = ImageUpload {
            file_name: "menu.pdf".to_owned(),
            content_type: "application/pdf".to_owned(),
            bytes: vec![1; 32],
        };
        let err = service
            .create(input("Menu", "1"), Some(pdf))
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::InvalidFileType(t) if t == "application/pdf"));
        assert!(assets.uploads().is_empty());
        assert_eq!(store.product_count(), 0);
    }

    #[tokio::test]
    async fn test_oversized_image_writes_nothing() {
        let store = MemoryStore::new();
        let assets = MemoryAssets::new();
        let service = CatalogService::new(&store, &assets, LIMIT);

        let err = service
            .create(input("Cake", "4"), Some(png("cake.png", 6 * 1024 * 1024)))
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::PayloadTooLarge { limit: LIMIT }));
        assert!(assets.uploads().is_empty());
        assert_eq!(store.product_count(), 0);
    }

    #[tokio::test]
    async fn test_bad_price_or_name_rejected_before_upload() {
        let store = MemoryStore::new();
        let assets = MemoryAssets::new();
        let service = CatalogService::new(&store, &assets, LIMIT);

        let err = service
            .create(input("Soup", "cheap"), Some(png("soup.png", 8)))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidPrice(_)));

        let err = service
            .create(input("Soup", "0.005"), Some(png("soup.png", 8)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::InvalidPrice(plated_core::PriceError::TooPrecise)
        ));

        let err = service
            .create(input("  ", "3"), Some(png("soup.png", 8)))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::MissingField("name")));

        assert!(assets.uploads().is_empty());
    }

    #[tokio::test]
    async fn test_key_collision_surfaces_and_skips_insert() {
        let store = MemoryStore::new();
        let assets = MemoryAssets::new();
        assets.collide_next();
        let service = CatalogService::new(&store, &assets, LIMIT);

        let err = service
            .create(input("Taco", "2.5"), Some(png("taco.png", 8)))
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::AssetKeyCollision(_)));
        assert_eq!(store.product_count(), 0);
    }

    #[tokio::test]
    async fn test_insert_failure_after_upload_is_reported() {
        let store = MemoryStore::new();
        store.fail_writes();
        let assets = MemoryAssets::new();
        let service = CatalogService::new(&store, &assets, LIMIT);

        let err = service
            .create(input("Taco", "2.5"), Some(png("taco.png", 8)))
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::Repository(_)));
        assert_eq!(assets.uploads().len(), 1);
    }

    #[tokio::test]
    async fn test_update_without_image_keeps_image_url() {
        let store = MemoryStore::new();
        let assets = MemoryAssets::new();
        let service = CatalogService::new(&store, &assets, LIMIT);

        let created = service
            .create(input("Ramen", "11.00"), Some(png("ramen.png", 8)))
            .await
            .unwrap();

        let updated = service
            .update(
                created.id,
                ProductInput {
                    price: Some("12.00".to_owned()),
                    ..ProductInput::default()
                },
                None,
            )
            .await
            .unwrap();

        assert_eq!(updated.price.to_string(), "12.00");
        assert_eq!(updated.name, "Ramen");
        assert_eq!(updated.image_url, created.image_url);
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(assets.uploads().len(), 1);
    }

    #[tokio::test]
    async fn test_update_with_image_repoints_url() {
        let store = MemoryStore::new();
        let assets = MemoryAssets::new();
        let service = CatalogService::new(&store, &assets, LIMIT);

        let created = service
            .create(input("Ramen", "11.00"), Some(png("ramen.png", 8)))
            .await
            .unwrap();
        let updated = service
            .update(created.id, ProductInput::default(), Some(png("new.jpg", 8)))
            .await
            .unwrap();

        assert_ne!(updated.image_url, created.image_url);
        assert!(updated.image_url.unwrap().ends_with(".jpg"));
        assert_eq!(assets.uploads().len(), 2);
    }

    #[tokio::test]
    async fn test_update_unknown_product() {
        let store = MemoryStore::new();
        let assets = MemoryAssets::new();
        let service = CatalogService::new(&store, &assets, LIMIT);

        let err = service
            .update(ProductId::new(77), input("Ghost", "1"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(id) if id == ProductId::new(77)));
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let store = MemoryStore::new();
        let assets = MemoryAssets::new();
        let older = store.seed_product("Older", "1");
        let newer = store.seed_product("Newer", "2");
        let service = CatalogService::new(&store, &assets, LIMIT);

        let ids: Vec<_> = service.list().await.unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }

    #[test]
    fn test_is_image_type() {
        assert!(is_image_type("image/png"));
        assert!(is_image_type("IMAGE/JPEG"));
        assert!(!is_image_type("image"));
        assert!(!is_image_type("text/plain"));
        assert!(!is_image_type(""));
    }
}
