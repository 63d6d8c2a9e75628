/// Ingredient catalogue endpoints (read-only, unpaginated)
///
/// - `GET /api/ingredients?name=<prefix>` - Search by case-insensitive name prefix
/// - `GET /api/ingredients/:id` - One ingredient

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{Json, Path, Query},
};
use axum::extract::State;
use recipebook_shared::models::ingredient::Ingredient;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct IngredientQuery {
    pub name: Option<String>,
}

pub async fn list_ingredients(
    State(state): State<AppState>,
    Query(query): Query<IngredientQuery>,
) -> ApiResult<Json<Vec<Ingredient>>> {
    let ingredients = Ingredient::search(&state.db, query.name.as_deref()).await?;
    Ok(Json(ingredients))
}

pub async fn get_ingredient(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Ingredient>> {
    Ingredient::find_by_id(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Ingredient {} not found", id)))
}
