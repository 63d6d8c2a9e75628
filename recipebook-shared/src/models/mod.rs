/// Database models for Recipebook
///
/// Each model owns its queries as associated functions taking a `&PgPool`.
///
/// # Models
///
/// - `user`: Accounts, credentials and avatars
/// - `subscription`: Who follows which author
/// - `ingredient`: Ingredient catalogue (name + measurement unit)
/// - `recipe`: Recipes, their ingredient lines and list filters
///
/// # Example
///
/// ```no_run
/// use recipebook_shared::models::ingredient::Ingredient;
/// use recipebook_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let matches = Ingredient::search(&pool, Some("sal")).await?;
/// # Ok(())
/// # }
/// ```

pub mod ingredient;
pub mod recipe;
pub mod subscription;
pub mod user;
