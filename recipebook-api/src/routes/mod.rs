/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Token login / logout
/// - `users`: Registration, profile, avatar and subscriptions
/// - `ingredients`: Ingredient catalogue
/// - `recipes`: Recipe CRUD and short links
/// - `collections`: Favorites, shopping cart and shopping list download

pub mod auth;
pub mod collections;
pub mod health;
pub mod ingredients;
pub mod recipes;
pub mod users;
