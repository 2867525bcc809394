//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Credential validation in front of the identity provider
//! - `cart` - Per-user cart with merge-on-add semantics
//! - `catalog` - Product listing and image-backed create/update
//!
//! Services borrow their collaborators from [`crate::state::AppState`] for the
//! duration of one request.

pub mod auth;
pub mod cart;
pub mod catalog;

pub use auth::{AuthError, AuthService};
pub use cart::{CartError, CartService};
pub use catalog::{CatalogError, CatalogService, ImageUpload, ProductInput};
