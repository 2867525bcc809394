//! In-memory doubles for unit and route tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tower::ServiceExt;
use url::Url;
use uuid::Uuid;

use plated_core::{CartId, CartLineId, Email, Price, ProductId, UserId};

use crate::assets::{AssetKey, AssetStore, AssetStoreError};
use crate::config::{ApiConfig, DEFAULT_MAX_IMAGE_BYTES, SupabaseConfig};
use crate::db::{CartRepository, CatalogRepository, RepositoryError};
use crate::identity::{IdentityError, IdentityProvider, SignUp};
use crate::models::{
    AuthSession, Cart, CartDetail, CartLine, CartLineDetail, Identity, LineUpsert, NewProduct,
    Product, ProductChanges, QuantityChange, Registration,
};
use crate::services::ImageUpload;
use crate::state::{AppState, Backends};

/// Password accepted by [`StaticIdentity::sign_in`].
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Deterministic user ID.
pub fn user_id(n: u128) -> UserId {
    UserId::new(Uuid::from_u128(n))
}

/// A PNG upload of `size` bytes.
pub fn png(file_name: &str, size: usize) -> ImageUpload {
    ImageUpload {
        file_name: file_name.to_owned(),
        content_type: "image/png".to_owned(),
        bytes: vec![0x89; size],
    }
}

pub fn test_config() -> ApiConfig {
    ApiConfig {
        database_url: SecretString::from("postgres://localhost/plated_test"),
        host: [127, 0, 0, 1].into(),
        port: 0,
        environment: "test".to_owned(),
        supabase: SupabaseConfig {
            url: Url::parse("https://project.supabase.test").unwrap(),
            anon_key: SecretString::from("anon"),
            service_role_key: SecretString::from("service"),
            storage_bucket: "food-images".to_owned(),
            timeout: Duration::from_secs(1),
        },
        max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        cors_origins: vec!["http://localhost:3000".to_owned()],
        identity_cache_ttl: Duration::from_secs(30),
        json_logs: false,
        sentry_dsn: None,
    }
}

// =============================================================================
// MemoryStore
// =============================================================================

#[derive(Default)]
struct MemoryState {
    carts: Vec<Cart>,
    lines: Vec<CartLine>,
    products: Vec<Product>,
    next_id: i64,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Both repositories over shared in-memory tables.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write (and `ping`) fail.
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn seed_product(&self, name: &str, price: &str) -> Product {
        let mut state = self.state.lock().unwrap();
        let now = Utc::now();
        let product = Product {
            id: ProductId::new(state.next_id()),
            name: name.to_owned(),
            description: None,
            price: Price::parse(price).unwrap(),
            category: None,
            image_url: None,
            created_at: now,
            updated_at: now,
        };
        state.products.push(product.clone());
        product
    }

    pub fn cart_count(&self) -> usize {
        self.state.lock().unwrap().carts.len()
    }

    pub fn line_count(&self) -> usize {
        self.state.lock().unwrap().lines.len()
    }

    pub fn product_count(&self) -> usize {
        self.state.lock().unwrap().products.len()
    }

    pub fn find_line_for(&self, owner: UserId, product_id: ProductId) -> Option<CartLine> {
        let state = self.state.lock().unwrap();
        let cart = state.carts.iter().find(|c| c.user_id == owner)?;
        state
            .lines
            .iter()
            .find(|l| l.cart_id == cart.id && l.food_item_id == product_id)
            .cloned()
    }

    fn check_writes(&self) -> Result<(), RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl CartRepository for MemoryStore {
    async fn get_cart(&self, owner: UserId) -> Result<Option<Cart>, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state.carts.iter().find(|c| c.user_id == owner).cloned())
    }

    async fn get_cart_with_lines(
        &self,
        owner: UserId,
    ) -> Result<Option<CartDetail>, RepositoryError> {
        let state = self.state.lock().unwrap();
        let Some(cart) = state.carts.iter().find(|c| c.user_id == owner).cloned() else {
            return Ok(None);
        };

        let mut lines: Vec<&CartLine> = state
            .lines
            .iter()
            .filter(|l| l.cart_id == cart.id)
            .collect();
        lines.sort_by_key(|l| (l.created_at, l.id.as_i64()));

        let cart_items = lines
            .into_iter()
            .map(|line| {
                let food_item = state
                    .products
                    .iter()
                    .find(|p| p.id == line.food_item_id)
                    .cloned()
                    .ok_or_else(|| RepositoryError::DataCorruption("dangling line".to_owned()))?;
                Ok(CartLineDetail {
                    line: line.clone(),
                    food_item,
                })
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        Ok(Some(CartDetail { cart, cart_items }))
    }

    async fn get_or_create_cart(&self, owner: UserId) -> Result<Cart, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        if let Some(cart) = state.carts.iter().find(|c| c.user_id == owner) {
            return Ok(cart.clone());
        }
        self.check_writes()?;

        let cart = Cart {
            id: CartId::new(state.next_id()),
            user_id: owner,
            created_at: Utc::now(),
        };
        state.carts.push(cart.clone());
        Ok(cart)
    }

    async fn find_line(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartLine>, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .lines
            .iter()
            .find(|l| l.cart_id == cart_id && l.food_item_id == product_id)
            .cloned())
    }

    async fn upsert_line_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        change: QuantityChange,
    ) -> Result<LineUpsert, RepositoryError> {
        self.check_writes()?;
        let mut state = self.state.lock().unwrap();
        if !state.products.iter().any(|p| p.id == product_id) {
            return Err(RepositoryError::NotFound);
        }

        let now = Utc::now();
        if let Some(line) = state
            .lines
            .iter_mut()
            .find(|l| l.cart_id == cart_id && l.food_item_id == product_id)
        {
            line.quantity = match change {
                QuantityChange::Increment(q) => line
                    .quantity
                    .checked_add(q)
                    .ok_or(RepositoryError::QuantityOverflow)?,
                QuantityChange::Set(q) => q,
            };
            line.updated_at = now;
            return Ok(LineUpsert {
                line: line.clone(),
                created: false,
            });
        }

        let line = CartLine {
            id: CartLineId::new(state.next_id()),
            cart_id,
            food_item_id: product_id,
            quantity: change.quantity(),
            created_at: now,
            updated_at: now,
        };
        state.lines.push(line.clone());
        Ok(LineUpsert {
            line,
            created: true,
        })
    }

    async fn set_line_quantity(
        &self,
        cart_id: CartId,
        line_id: CartLineId,
        quantity: plated_core::Quantity,
    ) -> Result<Option<CartLine>, RepositoryError> {
        self.check_writes()?;
        let mut state = self.state.lock().unwrap();
        Ok(state
            .lines
            .iter_mut()
            .find(|l| l.cart_id == cart_id && l.id == line_id)
            .map(|line| {
                line.quantity = quantity;
                line.updated_at = Utc::now();
                line.clone()
            }))
    }

    async fn delete_line(
        &self,
        cart_id: CartId,
        line_id: CartLineId,
    ) -> Result<bool, RepositoryError> {
        self.check_writes()?;
        let mut state = self.state.lock().unwrap();
        let before = state.lines.len();
        state
            .lines
            .retain(|l| !(l.cart_id == cart_id && l.id == line_id));
        Ok(state.lines.len() < before)
    }
}

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let state = self.state.lock().unwrap();
        let mut products = state.products.clone();
        products.sort_by_key(|p| std::cmp::Reverse((p.created_at, p.id.as_i64())));
        Ok(products)
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        self.check_writes()?;
        let mut state = self.state.lock().unwrap();
        let now = Utc::now();
        let product = Product {
            id: ProductId::new(state.next_id()),
            name: product.name,
            description: product.description,
            price: product.price,
            category: product.category,
            image_url: Some(product.image_url),
            created_at: now,
            updated_at: now,
        };
        state.products.push(product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        id: ProductId,
        changes: ProductChanges,
    ) -> Result<Option<Product>, RepositoryError> {
        self.check_writes()?;
        let mut state = self.state.lock().unwrap();
        let Some(product) = state.products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };

        if let Some(name) = changes.name {
            product.name = name;
        }
        if let Some(description) = changes.description {
            product.description = Some(description);
        }
        if let Some(price) = changes.price {
            product.price = price;
        }
        if let Some(category) = changes.category {
            product.category = Some(category);
        }
        if let Some(image_url) = changes.image_url {
            product.image_url = Some(image_url);
        }
        product.updated_at = Utc::now();
        Ok(Some(product.clone()))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        self.check_writes()
    }
}

// =============================================================================
// MemoryAssets
// =============================================================================

/// Records uploaded keys; can be told to report a collision.
#[derive(Default)]
pub struct MemoryAssets {
    uploads: Mutex<Vec<String>>,
    collide: AtomicBool,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report the next upload as an existing key.
    pub fn collide_next(&self) {
        self.collide.store(true, Ordering::SeqCst);
    }

    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetStore for MemoryAssets {
    async fn upload(
        &self,
        key: &AssetKey,
        _bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), AssetStoreError> {
        if self.collide.swap(false, Ordering::SeqCst) {
            return Err(AssetStoreError::AlreadyExists(key.to_string()));
        }
        self.uploads.lock().unwrap().push(key.to_string());
        Ok(())
    }

    fn public_url(&self, key: &AssetKey) -> String {
        format!("https://assets.test/{key}")
    }
}

// =============================================================================
// StaticIdentity
// =============================================================================

/// Identity provider over a fixed token table.
#[derive(Default)]
pub struct StaticIdentity {
    tokens: Mutex<HashMap<String, Identity>>,
    lookups: AtomicUsize,
    sign_ups: AtomicUsize,
}

impl StaticIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh user reachable through `token`.
    pub fn add_user(&self, token: &str) -> Identity {
        let identity = identity(UserId::new(Uuid::new_v4()), &format!("{token}@example.com"));
        self.tokens
            .lock()
            .unwrap()
            .insert(token.to_owned(), identity.clone());
        identity
    }

    /// Number of `get_user` calls that reached the provider.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn sign_ups(&self) -> usize {
        self.sign_ups.load(Ordering::SeqCst)
    }

    fn issue_session(&self, user: Identity) -> AuthSession {
        let access_token = format!("session-{}", Uuid::new_v4());
        self.tokens
            .lock()
            .unwrap()
            .insert(access_token.clone(), user.clone());
        AuthSession {
            access_token,
            token_type: "bearer".to_owned(),
            expires_in: Some(3600),
            expires_at: None,
            refresh_token: Some("refresh".to_owned()),
            user,
        }
    }
}

fn identity(id: UserId, email: &str) -> Identity {
    Identity {
        id,
        email: Some(email.to_owned()),
        role: Some("authenticated".to_owned()),
        user_metadata: Value::Null,
        created_at: Some(Utc::now()),
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn sign_up(&self, request: &SignUp) -> Result<Registration, IdentityError> {
        self.sign_ups.fetch_add(1, Ordering::SeqCst);
        let mut user = identity(UserId::new(Uuid::new_v4()), request.email.as_str());
        user.user_metadata = json!({
            "username": request.username,
            "role": request.role,
        });
        let session = self.issue_session(user.clone());
        Ok(Registration {
            user,
            session: Some(session),
        })
    }

    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthSession, IdentityError> {
        if password.expose_secret() != TEST_PASSWORD {
            return Err(IdentityError::InvalidCredentials);
        }
        let user = identity(UserId::new(Uuid::new_v4()), email.as_str());
        Ok(self.issue_session(user))
    }

    async fn get_user(&self, access_token: &str) -> Result<Option<Identity>, IdentityError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.tokens.lock().unwrap().get(access_token).cloned())
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        self.tokens.lock().unwrap().remove(access_token);
        Ok(())
    }
}

// =============================================================================
// Router harness
// =============================================================================

/// A fully wired application over the in-memory doubles.
pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub assets: Arc<MemoryAssets>,
    pub identity: Arc<StaticIdentity>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let assets = Arc::new(MemoryAssets::new());
        let identity = Arc::new(StaticIdentity::new());

        let state = AppState::new(
            test_config(),
            Backends {
                carts: store.clone(),
                catalog: store.clone(),
                assets: assets.clone(),
                identity: identity.clone(),
            },
        );

        Self {
            state,
            store,
            assets,
            identity,
        }
    }

    pub fn router(&self) -> Router {
        crate::routes::app(self.state.clone())
    }

    /// Send one request and decode the JSON body (`Null` when empty).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }
}

/// Request builder preset with a client address for the rate limiter.
pub fn request(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", "203.0.113.7")
}

/// JSON request helper.
pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = request(method, uri).header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Minimal `multipart/form-data` encoder.
pub struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self {
            boundary: "plated-test-boundary".to_owned(),
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self
    }

    #[must_use]
    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn into_request(mut self, method: &str, uri: &str) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        request(method, uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", self.boundary),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use plated_core::Quantity;

    use super::*;

    #[tokio::test]
    async fn test_find_line_is_scoped_to_cart() {
        let store = MemoryStore::new();
        let pizza = store.seed_product("Pizza", "12.50");
        let soup = store.seed_product("Soup", "4.00");
        let alice = store.get_or_create_cart(user_id(1)).await.unwrap();
        let bob = store.get_or_create_cart(user_id(2)).await.unwrap();

        let line = store
            .upsert_line_quantity(alice.id, pizza.id, QuantityChange::Increment(Quantity::new(2).unwrap()))
            .await
            .unwrap()
            .line;

        assert_eq!(store.find_line(alice.id, pizza.id).await.unwrap(), Some(line));
        assert_eq!(store.find_line(alice.id, soup.id).await.unwrap(), None);
        assert_eq!(store.find_line(bob.id, pizza.id).await.unwrap(), None);
    }
}
