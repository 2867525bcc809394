//! Domain models for the API.
//!
//! These types represent validated domain objects separate from database row types.

pub mod cart;
pub mod identity;
pub mod product;

pub use cart::{Cart, CartDetail, CartLine, CartLineDetail, LineUpsert, QuantityChange};
pub use identity::{AuthSession, Identity, Registration};
pub use product::{NewProduct, Product, ProductChanges};
