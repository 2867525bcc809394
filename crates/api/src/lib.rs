//! Plated API library.
//!
//! The HTTP backend for a food-ordering app: auth pass-through to the
//! identity provider, a product catalog with image uploads, and per-user
//! carts. Exposed as a library so the router can be tested in-process.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod assets;
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

#[cfg(test)]
mod testing;
