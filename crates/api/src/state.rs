//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::assets::{AssetStore, AssetStoreError, SupabaseStorage};
use crate::config::ApiConfig;
use crate::db::{CartRepository, CatalogRepository, PgCartRepository, PgCatalogRepository};
use crate::identity::{GoTrueClient, IdentityError, IdentityProvider, IdentityResolver};
use crate::services::{AuthService, CartService, CatalogService};

/// Error wiring the production backends.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("blob store client: {0}")]
    Assets(#[from] AssetStoreError),
    #[error("identity provider client: {0}")]
    Identity(#[from] IdentityError),
}

/// The stores and gateways the application runs against.
pub struct Backends {
    pub carts: Arc<dyn CartRepository>,
    pub catalog: Arc<dyn CatalogRepository>,
    pub assets: Arc<dyn AssetStore>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl Backends {
    /// `PostgreSQL` repositories plus the Supabase storage and auth clients.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn production(config: &ApiConfig, pool: PgPool) -> Result<Self, StateError> {
        Ok(Self {
            carts: Arc::new(PgCartRepository::new(pool.clone())),
            catalog: Arc::new(PgCatalogRepository::new(pool)),
            assets: Arc::new(SupabaseStorage::new(&config.supabase)?),
            identity: Arc::new(GoTrueClient::new(&config.supabase)?),
        })
    }
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like repositories and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    carts: Arc<dyn CartRepository>,
    catalog: Arc<dyn CatalogRepository>,
    assets: Arc<dyn AssetStore>,
    identity: IdentityResolver,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: ApiConfig, backends: Backends) -> Self {
        let identity = IdentityResolver::new(backends.identity, config.identity_cache_ttl);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                carts: backends.carts,
                catalog: backends.catalog,
                assets: backends.assets,
                identity,
            }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the catalog repository.
    #[must_use]
    pub fn catalog(&self) -> &dyn CatalogRepository {
        self.inner.catalog.as_ref()
    }

    /// Get a reference to the token resolver.
    #[must_use]
    pub fn identity(&self) -> &IdentityResolver {
        &self.inner.identity
    }

    /// Authentication service for this request.
    #[must_use]
    pub fn auth_service(&self) -> AuthService<'_> {
        AuthService::new(&self.inner.identity)
    }

    /// Cart service for this request.
    #[must_use]
    pub fn cart_service(&self) -> CartService<'_> {
        CartService::new(self.inner.carts.as_ref())
    }

    /// Catalog service for this request.
    #[must_use]
    pub fn catalog_service(&self) -> CatalogService<'_> {
        CatalogService::new(
            self.inner.catalog.as_ref(),
            self.inner.assets.as_ref(),
            self.inner.config.max_image_bytes,
        )
    }
}
