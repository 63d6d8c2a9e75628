/// Recipe model and database operations
///
/// A recipe belongs to one author and lists ingredients through the
/// `recipe_ingredients` join table, which carries the amount. Writes replace
/// the whole ingredient list inside one transaction.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE recipes (
///     id BIGSERIAL PRIMARY KEY,
///     author_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     name VARCHAR(256) NOT NULL,
///     image TEXT NOT NULL,
///     text TEXT NOT NULL,
///     cooking_time INTEGER NOT NULL CHECK (cooking_time >= 1),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE recipe_ingredients (
///     recipe_id BIGINT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
///     ingredient_id BIGINT NOT NULL REFERENCES ingredients(id) ON DELETE CASCADE,
///     amount INTEGER NOT NULL CHECK (amount >= 1),
///     PRIMARY KEY (recipe_id, ingredient_id)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use recipebook_shared::models::recipe::{CreateRecipe, IngredientAmount, Recipe};
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, author_id: i64) -> Result<(), sqlx::Error> {
/// let recipe = Recipe::create(&pool, CreateRecipe {
///     author_id,
///     name: "Pancakes".to_string(),
///     image: "data:image/png;base64,iVBORw0KGgo=".to_string(),
///     text: "Mix and fry.".to_string(),
///     cooking_time: 20,
///     ingredients: vec![
///         IngredientAmount { id: 1, amount: 200 },
///         IngredientAmount { id: 2, amount: 2 },
///     ],
/// }).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::{HashMap, HashSet};

use super::user::UserView;

/// Recipe row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Recipe {
    pub id: i64,
    pub author_id: i64,
    pub name: String,
    pub image: String,
    pub text: String,

    /// Minutes, at least 1
    pub cooking_time: i32,

    pub created_at: DateTime<Utc>,
}

/// One `(ingredient, amount)` entry of a recipe submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientAmount {
    /// Ingredient id
    pub id: i64,

    pub amount: i32,
}

/// Why a recipe submission was rejected before touching the database
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecipeValidationError {
    #[error("A recipe needs at least one ingredient")]
    NoIngredients,

    #[error("Ingredient {ingredient_id} has amount {amount}; amounts start at 1")]
    NonPositiveAmount { ingredient_id: i64, amount: i32 },

    #[error("Ingredient {0} is listed more than once")]
    DuplicateIngredient(i64),

    #[error("Unknown ingredient ids: {0:?}")]
    UnknownIngredients(Vec<i64>),

    #[error("Cooking time must be at least 1 minute")]
    NonPositiveCookingTime,
}

impl RecipeValidationError {
    /// Request field the error refers to
    pub fn field(&self) -> &'static str {
        match self {
            RecipeValidationError::NonPositiveCookingTime => "cooking_time",
            _ => "ingredients",
        }
    }
}

/// Checks an ingredient list: non-empty, every amount ≥ 1, no repeated ids
pub fn validate_ingredients(ingredients: &[IngredientAmount]) -> Result<(), RecipeValidationError> {
    if ingredients.is_empty() {
        return Err(RecipeValidationError::NoIngredients);
    }

    let mut seen = HashSet::with_capacity(ingredients.len());
    for entry in ingredients {
        if entry.amount < 1 {
            return Err(RecipeValidationError::NonPositiveAmount {
                ingredient_id: entry.id,
                amount: entry.amount,
            });
        }
        if !seen.insert(entry.id) {
            return Err(RecipeValidationError::DuplicateIngredient(entry.id));
        }
    }

    Ok(())
}

/// Reports ids from `requested` missing in `existing`, in request order
pub fn unknown_ingredient_ids(requested: &[IngredientAmount], existing: &[i64]) -> Vec<i64> {
    let existing: HashSet<i64> = existing.iter().copied().collect();
    requested
        .iter()
        .map(|entry| entry.id)
        .filter(|id| !existing.contains(id))
        .collect()
}

/// Input for creating a recipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRecipe {
    pub author_id: i64,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub ingredients: Vec<IngredientAmount>,
}

/// Input for updating a recipe
///
/// Scalar fields are optional; the ingredient list is always replaced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRecipe {
    pub name: Option<String>,
    pub image: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub ingredients: Vec<IngredientAmount>,
}

/// Compact recipe representation used in collections and subscriptions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ShortRecipe {
    pub id: i64,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

/// Ingredient line of a recipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RecipeIngredientView {
    #[serde(skip)]
    pub recipe_id: i64,

    /// Ingredient id
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// List filters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author: Option<i64>,

    /// Only applied for authenticated viewers
    pub is_favorited: Option<bool>,

    /// Only applied for authenticated viewers
    pub is_in_shopping_cart: Option<bool>,
}

/// A recipe as seen by a (possibly anonymous) viewer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeView {
    pub id: i64,
    pub author: UserView,
    pub ingredients: Vec<RecipeIngredientView>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

#[derive(Debug, sqlx::FromRow)]
struct RecipeViewRow {
    id: i64,
    name: String,
    image: String,
    text: String,
    cooking_time: i32,
    author_id: i64,
    author_email: String,
    author_username: String,
    author_first_name: String,
    author_last_name: String,
    author_avatar: Option<String>,
    author_is_subscribed: bool,
    is_favorited: bool,
    is_in_shopping_cart: bool,
}

impl RecipeViewRow {
    fn into_view(self, ingredients: Vec<RecipeIngredientView>) -> RecipeView {
        RecipeView {
            id: self.id,
            author: UserView {
                id: self.author_id,
                email: self.author_email,
                username: self.author_username,
                first_name: self.author_first_name,
                last_name: self.author_last_name,
                avatar: self.author_avatar,
                is_subscribed: self.author_is_subscribed,
            },
            ingredients,
            is_favorited: self.is_favorited,
            is_in_shopping_cart: self.is_in_shopping_cart,
            name: self.name,
            image: self.image,
            text: self.text,
            cooking_time: self.cooking_time,
        }
    }
}

async fn insert_ingredients(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    recipe_id: i64,
    ingredients: &[IngredientAmount],
) -> Result<(), sqlx::Error> {
    let ids: Vec<i64> = ingredients.iter().map(|entry| entry.id).collect();
    let amounts: Vec<i32> = ingredients.iter().map(|entry| entry.amount).collect();

    sqlx::query(
        r#"
        INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount)
        SELECT $1, ingredient_id, amount
        FROM UNNEST($2::BIGINT[], $3::INTEGER[]) AS t(ingredient_id, amount)
        "#,
    )
    .bind(recipe_id)
    .bind(ids)
    .bind(amounts)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

impl Recipe {
    /// Inserts a recipe and its ingredient lines atomically
    ///
    /// # Errors
    ///
    /// Check, unique and foreign-key violations surface as database errors;
    /// call [`validate_ingredients`] first to report them nicely.
    pub async fn create(pool: &PgPool, data: CreateRecipe) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let recipe = sqlx::query_as::<_, Recipe>(
            r#"
            INSERT INTO recipes (author_id, name, image, text, cooking_time)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, author_id, name, image, text, cooking_time, created_at
            "#,
        )
        .bind(data.author_id)
        .bind(data.name)
        .bind(data.image)
        .bind(data.text)
        .bind(data.cooking_time)
        .fetch_one(&mut *tx)
        .await?;

        insert_ingredients(&mut tx, recipe.id, &data.ingredients).await?;

        tx.commit().await?;
        Ok(recipe)
    }

    /// Updates scalar fields and replaces the ingredient list
    ///
    /// Returns `None` if the recipe doesn't exist.
    pub async fn update(
        pool: &PgPool,
        id: i64,
        data: UpdateRecipe,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let recipe = sqlx::query_as::<_, Recipe>(
            r#"
            UPDATE recipes
            SET name = COALESCE($2, name),
                image = COALESCE($3, image),
                text = COALESCE($4, text),
                cooking_time = COALESCE($5, cooking_time)
            WHERE id = $1
            RETURNING id, author_id, name, image, text, cooking_time, created_at
            "#,
        )
        .bind(id)
        .bind(data.name)
        .bind(data.image)
        .bind(data.text)
        .bind(data.cooking_time)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(recipe) = recipe else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        insert_ingredients(&mut tx, id, &data.ingredients).await?;

        tx.commit().await?;
        Ok(Some(recipe))
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Recipe>(
            r#"
            SELECT id, author_id, name, image, text, cooking_time, created_at
            FROM recipes
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn exists(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM recipes WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// Deletes a recipe; ingredient lines and collection entries cascade
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count_by_author(pool: &PgPool, author_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
            .bind(author_id)
            .fetch_one(pool)
            .await
    }

    /// Counts recipes matching `filter` for `viewer`
    pub async fn count_filtered(
        pool: &PgPool,
        filter: &RecipeFilter,
        viewer: Option<i64>,
    ) -> Result<i64, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM recipes r");
        push_filters(&mut query, filter, viewer);

        query.build_query_scalar().fetch_one(pool).await
    }
}

impl ShortRecipe {
    pub async fn find(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ShortRecipe>(
            "SELECT id, name, image, cooking_time FROM recipes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Newest recipes of an author, optionally capped at `limit`
    pub async fn list_by_author(
        pool: &PgPool,
        author_id: i64,
        limit: Option<i64>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ShortRecipe>(
            r#"
            SELECT id, name, image, cooking_time
            FROM recipes
            WHERE author_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(author_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}

impl RecipeIngredientView {
    /// Ingredient lines for all `recipe_ids`, grouped by recipe
    pub async fn for_recipes(
        pool: &PgPool,
        recipe_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<Self>>, sqlx::Error> {
        let rows = sqlx::query_as::<_, RecipeIngredientView>(
            r#"
            SELECT ri.recipe_id, i.id, i.name, i.measurement_unit, ri.amount
            FROM recipe_ingredients ri
            JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE ri.recipe_id = ANY($1)
            ORDER BY ri.recipe_id, i.name, i.id
            "#,
        )
        .bind(recipe_ids)
        .fetch_all(pool)
        .await?;

        let mut grouped: HashMap<i64, Vec<Self>> = HashMap::new();
        for row in rows {
            grouped.entry(row.recipe_id).or_default().push(row);
        }
        Ok(grouped)
    }
}

const RECIPE_VIEW_SELECT: &str = "SELECT r.id, r.name, r.image, r.text, r.cooking_time, \
     u.id AS author_id, u.email AS author_email, u.username AS author_username, \
     u.first_name AS author_first_name, u.last_name AS author_last_name, \
     u.avatar AS author_avatar, ";

fn push_view_columns(query: &mut QueryBuilder<'_, Postgres>, viewer: Option<i64>) {
    query.push(RECIPE_VIEW_SELECT);
    query.push("EXISTS(SELECT 1 FROM subscriptions s WHERE s.subscriber_id = ");
    query.push_bind(viewer);
    query.push(" AND s.target_id = u.id) AS author_is_subscribed, ");
    query.push("EXISTS(SELECT 1 FROM favorites f WHERE f.user_id = ");
    query.push_bind(viewer);
    query.push(" AND f.recipe_id = r.id) AS is_favorited, ");
    query.push("EXISTS(SELECT 1 FROM shopping_cart c WHERE c.user_id = ");
    query.push_bind(viewer);
    query.push(" AND c.recipe_id = r.id) AS is_in_shopping_cart ");
    query.push("FROM recipes r JOIN users u ON u.id = r.author_id");
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &RecipeFilter, viewer: Option<i64>) {
    query.push(" WHERE TRUE");

    if let Some(author) = filter.author {
        query.push(" AND r.author_id = ");
        query.push_bind(author);
    }

    if let Some(viewer) = viewer {
        if let Some(favorited) = filter.is_favorited {
            query.push(if favorited { " AND EXISTS" } else { " AND NOT EXISTS" });
            query.push("(SELECT 1 FROM favorites ff WHERE ff.recipe_id = r.id AND ff.user_id = ");
            query.push_bind(viewer);
            query.push(")");
        }

        if let Some(in_cart) = filter.is_in_shopping_cart {
            query.push(if in_cart { " AND EXISTS" } else { " AND NOT EXISTS" });
            query.push("(SELECT 1 FROM shopping_cart cc WHERE cc.recipe_id = r.id AND cc.user_id = ");
            query.push_bind(viewer);
            query.push(")");
        }
    }
}

impl RecipeView {
    /// Loads one recipe with author, ingredients and viewer flags
    pub async fn find(
        pool: &PgPool,
        id: i64,
        viewer: Option<i64>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new("");
        push_view_columns(&mut query, viewer);
        query.push(" WHERE r.id = ");
        query.push_bind(id);

        let row = query
            .build_query_as::<RecipeViewRow>()
            .fetch_optional(pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut ingredients = RecipeIngredientView::for_recipes(pool, &[row.id]).await?;
        let lines = ingredients.remove(&row.id).unwrap_or_default();
        Ok(Some(row.into_view(lines)))
    }

    /// Lists recipes newest first, filtered and paginated
    pub async fn list(
        pool: &PgPool,
        filter: &RecipeFilter,
        viewer: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new("");
        push_view_columns(&mut query, viewer);
        push_filters(&mut query, filter, viewer);
        query.push(" ORDER BY r.created_at DESC, r.id DESC LIMIT ");
        query.push_bind(limit);
        query.push(" OFFSET ");
        query.push_bind(offset);

        let rows = query
            .build_query_as::<RecipeViewRow>()
            .fetch_all(pool)
            .await?;

        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        let mut ingredients = RecipeIngredientView::for_recipes(pool, &ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let lines = ingredients.remove(&row.id).unwrap_or_default();
                row.into_view(lines)
            })
            .collect())
    }
}
