//! # Recipebook Shared Library
//!
//! This crate contains the data layer and domain logic used by the Recipebook
//! API server and its command-line tools.
//!
//! ## Module Organization
//!
//! - `db`: Connection pool and migrations
//! - `models`: Database models and their queries
//! - `auth`: Password hashing, tokens and the request auth context
//! - `collections`: Favorites / shopping cart membership toggles
//! - `shopping_list`: Shopping cart ingredient aggregation

pub mod auth;
pub mod collections;
pub mod db;
pub mod models;
pub mod shopping_list;

/// Current version of the Recipebook shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
