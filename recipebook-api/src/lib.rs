//! # Recipebook API Server Library
//!
//! HTTP surface of the recipe sharing service: users and subscriptions,
//! the ingredient catalogue, recipes, favorites, the shopping cart and its
//! downloadable shopping list.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Extractors that reject with `ApiError`
//! - `middleware`: Response hardening
//! - `pagination`: Page-number pagination for list endpoints
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod pagination;
pub mod routes;
