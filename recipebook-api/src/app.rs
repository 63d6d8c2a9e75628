/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use recipebook_api::{app::{build_router, AppState}, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let app = build_router(AppState::new(pool, config));
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use recipebook_shared::{auth::middleware::create_jwt_middleware, collections::PgCollectionStore};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Request body limit; recipe images arrive inline as data URIs
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Shared application state
///
/// Cloned into every handler through Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,

    pub config: Arc<Config>,

    /// Favorites / shopping cart storage
    pub collections: PgCollectionStore,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            collections: PgCollectionStore::new(db.clone()),
            db,
            config: Arc::new(config),
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.api.cors_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([header::CONTENT_DISPOSITION])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET /health
/// ├── GET /s/:id                          short link redirect
/// └── /api
///     ├── /auth/token/{login,logout}
///     ├── /users                          list, register
///     │   ├── /me, /me/avatar, /set_password, /subscriptions
///     │   └── /:id, /:id/subscribe
///     ├── /ingredients, /ingredients/:id
///     └── /recipes                        list, create
///         ├── /download_shopping_cart
///         └── /:id, /:id/get-link, /:id/favorite, /:id/shopping_cart
/// ```
///
/// Every request passes the token middleware; handlers that need a user take
/// an `AuthContext`, the rest take `Option<AuthContext>` or nothing.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let auth_routes = Router::new()
        .route("/token/login", post(routes::auth::login))
        .route("/token/logout", post(routes::auth::logout));

    let user_routes = Router::new()
        .route(
            "/",
            get(routes::users::list_users).post(routes::users::register),
        )
        .route("/me", get(routes::users::me))
        .route(
            "/me/avatar",
            put(routes::users::set_avatar).delete(routes::users::delete_avatar),
        )
        .route("/set_password", post(routes::users::set_password))
        .route("/subscriptions", get(routes::users::subscriptions))
        .route("/:id", get(routes::users::get_user))
        .route(
            "/:id/subscribe",
            post(routes::users::subscribe).delete(routes::users::unsubscribe),
        );

    let ingredient_routes = Router::new()
        .route("/", get(routes::ingredients::list_ingredients))
        .route("/:id", get(routes::ingredients::get_ingredient));

    let recipe_routes = Router::new()
        .route(
            "/",
            get(routes::recipes::list_recipes).post(routes::recipes::create_recipe),
        )
        .route(
            "/download_shopping_cart",
            get(routes::collections::download_shopping_cart),
        )
        .route(
            "/:id",
            get(routes::recipes::get_recipe)
                .patch(routes::recipes::update_recipe)
                .delete(routes::recipes::delete_recipe),
        )
        .route("/:id/get-link", get(routes::recipes::get_link))
        .route(
            "/:id/favorite",
            post(routes::collections::add_favorite).delete(routes::collections::remove_favorite),
        )
        .route(
            "/:id/shopping_cart",
            post(routes::collections::add_to_shopping_cart)
                .delete(routes::collections::remove_from_shopping_cart),
        );

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/ingredients", ingredient_routes)
        .nest("/recipes", recipe_routes);

    let cors = cors_layer(&state.config);
    let security = SecurityHeadersLayer::new(state.config.api.production);
    let authenticate = axum::middleware::from_fn(create_jwt_middleware(state.jwt_secret()));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/s/:id", get(routes::recipes::follow_short_link))
        .nest("/api", api_routes)
        .layer(authenticate)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(security)
        .with_state(state)
}
