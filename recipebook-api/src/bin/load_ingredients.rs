//! Bulk ingredient import
//!
//! Reads a JSON array of `{"name": ..., "measurement_unit": ...}` objects
//! and inserts them into the catalogue. Pairs already present are skipped,
//! so the import can be re-run safely.
//!
//! ```bash
//! cargo run -p recipebook-api --bin load-ingredients -- data/ingredients.json
//! ```

use anyhow::Context;
use recipebook_shared::{
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    models::ingredient::{CreateIngredient, Ingredient},
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Drops entries with a blank name or unit and trims the rest
fn normalize(ingredients: Vec<CreateIngredient>) -> Vec<CreateIngredient> {
    ingredients
        .into_iter()
        .filter_map(|ingredient| {
            let name = ingredient.name.trim();
            let measurement_unit = ingredient.measurement_unit.trim();
            if name.is_empty() || measurement_unit.is_empty() {
                return None;
            }
            Some(CreateIngredient {
                name: name.to_string(),
                measurement_unit: measurement_unit.to_string(),
            })
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "load_ingredients=info,recipebook_shared=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let path: PathBuf = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: load-ingredients <ingredients.json>")?;

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let parsed: Vec<CreateIngredient> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of ingredients", path.display()))?;

    let total = parsed.len();
    let ingredients = normalize(parsed);
    if ingredients.len() < total {
        tracing::warn!(skipped = total - ingredients.len(), "Skipped blank entries");
    }

    dotenvy::dotenv().ok();
    let url = std::env::var("DATABASE_URL").context("DATABASE_URL environment variable is required")?;

    let pool = create_pool(DatabaseConfig {
        url,
        max_connections: 2,
        ..Default::default()
    })
    .await?;

    run_migrations(&pool).await?;

    let inserted = Ingredient::create_many(&pool, &ingredients).await?;
    tracing::info!(
        file = %path.display(),
        read = ingredients.len(),
        inserted,
        "Ingredients loaded"
    );

    close_pool(pool).await;
    Ok(())
}
