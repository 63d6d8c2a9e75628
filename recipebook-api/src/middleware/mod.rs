/// Custom middleware for the API server
///
/// Token authentication lives in `recipebook_shared::auth::middleware`.

pub mod security;
