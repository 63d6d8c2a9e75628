/// Recipe endpoints
///
/// - `GET    /api/recipes` - Paginated, filterable recipe list
/// - `POST   /api/recipes` - Create a recipe
/// - `GET    /api/recipes/:id` - One recipe
/// - `PATCH  /api/recipes/:id` - Update (author only, replaces ingredients)
/// - `DELETE /api/recipes/:id` - Delete (author only)
/// - `GET    /api/recipes/:id/get-link` - Short link
/// - `GET    /s/:id` - Short link redirect

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{Json, Path, Query},
    pagination::{PageParams, Paginated},
};
use axum::{
    extract::{OriginalUri, State},
    http::{header, HeaderMap, StatusCode},
    response::Redirect,
};
use recipebook_shared::{
    auth::{authorization::require_author, middleware::AuthContext},
    models::{
        ingredient::Ingredient,
        recipe::{
            unknown_ingredient_ids, validate_ingredients, CreateRecipe, IngredientAmount, Recipe,
            RecipeFilter, RecipeValidationError, RecipeView, UpdateRecipe,
        },
    },
};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

/// Recipe list filters as they arrive in the query string
#[derive(Debug, Default, Deserialize)]
pub struct RecipeListQuery {
    pub author: Option<i64>,

    /// `1` only favorites, `0` everything else
    pub is_favorited: Option<u8>,

    /// `1` only cart recipes, `0` everything else
    pub is_in_shopping_cart: Option<u8>,
}

fn flag(field: &str, value: Option<u8>) -> ApiResult<Option<bool>> {
    match value {
        None => Ok(None),
        Some(0) => Ok(Some(false)),
        Some(1) => Ok(Some(true)),
        Some(_) => Err(ApiError::invalid_field(field, "Expected 0 or 1")),
    }
}

impl RecipeListQuery {
    pub fn filter(&self) -> ApiResult<RecipeFilter> {
        Ok(RecipeFilter {
            author: self.author,
            is_favorited: flag("is_favorited", self.is_favorited)?,
            is_in_shopping_cart: flag("is_in_shopping_cart", self.is_in_shopping_cart)?,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRecipeRequest {
    pub ingredients: Vec<IngredientAmount>,

    #[validate(length(min = 1, message = "This field is required"))]
    pub image: String,

    #[validate(length(min = 1, max = 256, message = "Name must be 1-256 characters"))]
    pub name: String,

    #[validate(length(min = 1, message = "This field may not be blank"))]
    pub text: String,

    pub cooking_time: i32,
}

/// Partial update; `ingredients` must always be sent
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRecipeRequest {
    pub ingredients: Option<Vec<IngredientAmount>>,

    #[validate(length(min = 1, message = "This field may not be blank"))]
    pub image: Option<String>,

    #[validate(length(min = 1, max = 256, message = "Name must be 1-256 characters"))]
    pub name: Option<String>,

    #[validate(length(min = 1, message = "This field may not be blank"))]
    pub text: Option<String>,

    pub cooking_time: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct ShortLinkResponse {
    #[serde(rename = "short-link")]
    pub short_link: String,
}

fn check_cooking_time(cooking_time: i32) -> Result<(), RecipeValidationError> {
    if cooking_time < 1 {
        return Err(RecipeValidationError::NonPositiveCookingTime);
    }
    Ok(())
}

/// Shape checks, then catalogue lookup of every ingredient id
async fn check_ingredients(state: &AppState, ingredients: &[IngredientAmount]) -> ApiResult<()> {
    validate_ingredients(ingredients)?;

    let ids: Vec<i64> = ingredients.iter().map(|entry| entry.id).collect();
    let existing = Ingredient::existing_ids(&state.db, &ids).await?;

    let unknown = unknown_ingredient_ids(ingredients, &existing);
    if !unknown.is_empty() {
        return Err(RecipeValidationError::UnknownIngredients(unknown).into());
    }

    Ok(())
}

async fn load_view(state: &AppState, id: i64, viewer: Option<i64>) -> ApiResult<RecipeView> {
    RecipeView::find(&state.db, id, viewer)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Recipe {} not found", id)))
}

/// Recipe list, newest first
///
/// ```text
/// GET /api/recipes?page=2&limit=6&author=3&is_favorited=1
/// ```
///
/// Collection filters are ignored for anonymous callers.
pub async fn list_recipes(
    State(state): State<AppState>,
    auth: Option<AuthContext>,
    Query(params): Query<PageParams>,
    Query(query): Query<RecipeListQuery>,
    OriginalUri(uri): OriginalUri,
) -> ApiResult<Json<Paginated<RecipeView>>> {
    let page = params.resolve(state.config.content.page_size)?;
    let filter = query.filter()?;
    let viewer = auth.map(|a| a.user_id);

    let count = Recipe::count_filtered(&state.db, &filter, viewer).await?;
    page.ensure_exists(count)?;

    let recipes = RecipeView::list(&state.db, &filter, viewer, page.limit(), page.offset()).await?;

    Ok(Json(Paginated::new(recipes, count, page, &uri)))
}

/// Create a recipe owned by the caller
///
/// ```text
/// POST /api/recipes
///
/// {
///   "ingredients": [{ "id": 1123, "amount": 10 }],
///   "image": "data:image/png;base64,iVBORw0KGgo...",
///   "name": "Pancakes",
///   "text": "Mix and fry.",
///   "cooking_time": 15
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Invalid field, empty / duplicate / unknown ingredients,
///   amount or cooking time below 1
pub async fn create_recipe(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateRecipeRequest>,
) -> ApiResult<(StatusCode, Json<RecipeView>)> {
    req.validate()?;
    check_cooking_time(req.cooking_time)?;
    check_ingredients(&state, &req.ingredients).await?;

    let recipe = Recipe::create(
        &state.db,
        CreateRecipe {
            author_id: auth.user_id,
            name: req.name,
            image: req.image,
            text: req.text,
            cooking_time: req.cooking_time,
            ingredients: req.ingredients,
        },
    )
    .await?;

    info!(recipe_id = recipe.id, author_id = auth.user_id, "Recipe created");

    let view = load_view(&state, recipe.id, Some(auth.user_id)).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_recipe(
    State(state): State<AppState>,
    auth: Option<AuthContext>,
    Path(id): Path<i64>,
) -> ApiResult<Json<RecipeView>> {
    let view = load_view(&state, id, auth.map(|a| a.user_id)).await?;
    Ok(Json(view))
}

/// Update a recipe; only its author may
///
/// # Errors
///
/// - `404 Not Found`: No such recipe
/// - `403 Forbidden`: Caller is not the author
/// - `400 Bad Request`: Missing `ingredients` or invalid field
pub async fn update_recipe(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i64>,
    Json(req): Json<UpdateRecipeRequest>,
) -> ApiResult<Json<RecipeView>> {
    let recipe = Recipe::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Recipe {} not found", id)))?;

    require_author(&auth, recipe.author_id)?;

    req.validate()?;
    if let Some(cooking_time) = req.cooking_time {
        check_cooking_time(cooking_time)?;
    }

    let ingredients = req
        .ingredients
        .ok_or_else(|| ApiError::invalid_field("ingredients", "This field is required"))?;
    check_ingredients(&state, &ingredients).await?;

    Recipe::update(
        &state.db,
        id,
        UpdateRecipe {
            name: req.name,
            image: req.image,
            text: req.text,
            cooking_time: req.cooking_time,
            ingredients,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Recipe {} not found", id)))?;

    info!(recipe_id = id, author_id = auth.user_id, "Recipe updated");

    let view = load_view(&state, id, Some(auth.user_id)).await?;
    Ok(Json(view))
}

pub async fn delete_recipe(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let recipe = Recipe::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Recipe {} not found", id)))?;

    require_author(&auth, recipe.author_id)?;

    Recipe::delete(&state.db, id).await?;
    info!(recipe_id = id, author_id = auth.user_id, "Recipe deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Base of short links: `PUBLIC_HOST` when set, else the request's `Host`
fn link_base(public_host: Option<&str>, headers: &HeaderMap) -> ApiResult<String> {
    if let Some(host) = public_host {
        return Ok(host.trim_end_matches('/').to_string());
    }

    headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| ApiError::BadRequest("Missing Host header".to_string()))
}

pub async fn get_link(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> ApiResult<Json<ShortLinkResponse>> {
    if !Recipe::exists(&state.db, id).await? {
        return Err(ApiError::NotFound(format!("Recipe {} not found", id)));
    }

    let base = link_base(state.config.api.public_host.as_deref(), &headers)?;

    Ok(Json(ShortLinkResponse {
        short_link: format!("{}/s/{}", base, id),
    }))
}

/// Short link target; the frontend renders `/recipes/:id`
pub async fn follow_short_link(Path(id): Path<i64>) -> Redirect {
    Redirect::temporary(&format!("/recipes/{}", id))
}
