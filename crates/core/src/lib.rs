//! Plated Core - Shared domain types.
//!
//! This crate provides the value types used by the Plated components:
//! - `api` - HTTP backend (auth pass-through, catalog, cart)
//! - `cli` - Command-line tools for migrations
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database
//! access, no HTTP clients. Database encode/decode support for the id
//! newtypes is behind the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, quantities, prices and emails

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
