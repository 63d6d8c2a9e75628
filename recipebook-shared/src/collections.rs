/// Favorites and shopping cart membership
///
/// Both collections are sets of `(user, recipe)` pairs with identical rules:
///
/// - adding a recipe that is already present is a conflict
/// - removing a recipe that is not present is a conflict
/// - both operations require the recipe to exist
///
/// The rules live in [`add`] and [`remove`], written once against the
/// [`CollectionStore`] trait. [`PgCollectionStore`] is the production backend;
/// its unique constraint decides races between concurrent duplicate inserts.
///
/// # Example
///
/// ```no_run
/// use recipebook_shared::collections::{add, Collection, PgCollectionStore};
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let store = PgCollectionStore::new(pool);
/// let recipe = add(&store, Collection::Favorites, 1, 42).await?;
/// println!("Favorited {}", recipe.name);
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::debug;

use crate::models::recipe::ShortRecipe;

/// A per-user set of recipes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Favorites,
    ShoppingCart,
}

impl Collection {
    /// Backing table
    pub fn table(&self) -> &'static str {
        match self {
            Collection::Favorites => "favorites",
            Collection::ShoppingCart => "shopping_cart",
        }
    }

    /// Human-readable name used in error messages
    pub fn label(&self) -> &'static str {
        match self {
            Collection::Favorites => "favorites",
            Collection::ShoppingCart => "shopping cart",
        }
    }
}

/// Collection operation errors
#[derive(Debug, thiserror::Error)]
pub enum CollectionError {
    #[error("Recipe {0} not found")]
    RecipeNotFound(i64),

    /// The acting user was deleted after their token was issued
    #[error("User {0} no longer exists")]
    UserNotFound(i64),

    #[error("Recipe {recipe_id} is already in {}", .collection.label())]
    AlreadyPresent {
        collection: Collection,
        recipe_id: i64,
    },

    #[error("Recipe {recipe_id} is not in {}", .collection.label())]
    NotPresent {
        collection: Collection,
        recipe_id: i64,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Storage backend for collection membership
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Short representation of the recipe, or `None` if it doesn't exist
    async fn find_recipe(&self, recipe_id: i64) -> Result<Option<ShortRecipe>, CollectionError>;

    /// Inserts the pair; returns false if it was already present
    ///
    /// A recipe deleted concurrently is reported as
    /// [`CollectionError::RecipeNotFound`], a deleted user as
    /// [`CollectionError::UserNotFound`].
    async fn insert(
        &self,
        collection: Collection,
        user_id: i64,
        recipe_id: i64,
    ) -> Result<bool, CollectionError>;

    /// Deletes the pair; returns false if it was not present
    async fn delete(
        &self,
        collection: Collection,
        user_id: i64,
        recipe_id: i64,
    ) -> Result<bool, CollectionError>;
}

/// Adds a recipe to a user's collection and returns its short form
pub async fn add<S: CollectionStore + ?Sized>(
    store: &S,
    collection: Collection,
    user_id: i64,
    recipe_id: i64,
) -> Result<ShortRecipe, CollectionError> {
    let recipe = store
        .find_recipe(recipe_id)
        .await?
        .ok_or(CollectionError::RecipeNotFound(recipe_id))?;

    if !store.insert(collection, user_id, recipe_id).await? {
        return Err(CollectionError::AlreadyPresent {
            collection,
            recipe_id,
        });
    }

    debug!(user_id, recipe_id, collection = collection.table(), "Recipe added to collection");
    Ok(recipe)
}

/// Removes a recipe from a user's collection
pub async fn remove<S: CollectionStore + ?Sized>(
    store: &S,
    collection: Collection,
    user_id: i64,
    recipe_id: i64,
) -> Result<(), CollectionError> {
    if store.find_recipe(recipe_id).await?.is_none() {
        return Err(CollectionError::RecipeNotFound(recipe_id));
    }

    if !store.delete(collection, user_id, recipe_id).await? {
        return Err(CollectionError::NotPresent {
            collection,
            recipe_id,
        });
    }

    debug!(user_id, recipe_id, collection = collection.table(), "Recipe removed from collection");
    Ok(())
}

/// Whether a foreign-key violation came from the `user_id` column
///
/// Both tables use the default `<table>_<column>_fkey` constraint names.
fn is_user_fkey(constraint: Option<&str>) -> bool {
    constraint.is_some_and(|name| name.ends_with("_user_id_fkey"))
}

/// PostgreSQL-backed collections
#[derive(Debug, Clone)]
pub struct PgCollectionStore {
    pool: PgPool,
}

impl PgCollectionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CollectionStore for PgCollectionStore {
    async fn find_recipe(&self, recipe_id: i64) -> Result<Option<ShortRecipe>, CollectionError> {
        Ok(ShortRecipe::find(&self.pool, recipe_id).await?)
    }

    async fn insert(
        &self,
        collection: Collection,
        user_id: i64,
        recipe_id: i64,
    ) -> Result<bool, CollectionError> {
        let sql = format!(
            "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2)
             ON CONFLICT (user_id, recipe_id) DO NOTHING",
            collection.table()
        );

        let result = sqlx::query(&sql)
            .bind(user_id)
            .bind(recipe_id)
            .execute(&self.pool)
            .await;

        match result {
            Ok(done) => Ok(done.rows_affected() > 0),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(false),
            Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
                if is_user_fkey(e.constraint()) {
                    Err(CollectionError::UserNotFound(user_id))
                } else {
                    Err(CollectionError::RecipeNotFound(recipe_id))
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(
        &self,
        collection: Collection,
        user_id: i64,
        recipe_id: i64,
    ) -> Result<bool, CollectionError> {
        let sql = format!(
            "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
            collection.table()
        );

        let result = sqlx::query(&sql)
            .bind(user_id)
            .bind(recipe_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    /// In-memory store for exercising the membership rules
    #[derive(Default)]
    pub struct MemoryCollectionStore {
        recipes: Mutex<HashMap<i64, ShortRecipe>>,
        deleted_users: Mutex<HashSet<i64>>,
        members: Mutex<HashSet<(Collection, i64, i64)>>,
    }

    impl MemoryCollectionStore {
        pub fn with_recipes(ids: &[i64]) -> Self {
            let store = Self::default();
            {
                let mut recipes = store.recipes.lock().unwrap();
                for &id in ids {
                    recipes.insert(
                        id,
                        ShortRecipe {
                            id,
                            name: format!("Recipe {id}"),
                            image: format!("recipes/{id}.png"),
                            cooking_time: 10,
                        },
                    );
                }
            }
            store
        }

        pub fn remove_recipe(&self, id: i64) {
            self.recipes.lock().unwrap().remove(&id);
            self.members
                .lock()
                .unwrap()
                .retain(|&(_, _, recipe_id)| recipe_id != id);
        }

        pub fn remove_user(&self, id: i64) {
            self.deleted_users.lock().unwrap().insert(id);
            self.members
                .lock()
                .unwrap()
                .retain(|&(_, user_id, _)| user_id != id);
        }

        pub fn contains(&self, collection: Collection, user_id: i64, recipe_id: i64) -> bool {
            self.members
                .lock()
                .unwrap()
                .contains(&(collection, user_id, recipe_id))
        }
    }

    #[async_trait]
    impl CollectionStore for MemoryCollectionStore {
        async fn find_recipe(
            &self,
            recipe_id: i64,
        ) -> Result<Option<ShortRecipe>, CollectionError> {
            Ok(self.recipes.lock().unwrap().get(&recipe_id).cloned())
        }

        async fn insert(
            &self,
            collection: Collection,
            user_id: i64,
            recipe_id: i64,
        ) -> Result<bool, CollectionError> {
            if !self.recipes.lock().unwrap().contains_key(&recipe_id) {
                return Err(CollectionError::RecipeNotFound(recipe_id));
            }
            if self.deleted_users.lock().unwrap().contains(&user_id) {
                return Err(CollectionError::UserNotFound(user_id));
            }
            Ok(self
                .members
                .lock()
                .unwrap()
                .insert((collection, user_id, recipe_id)))
        }

        async fn delete(
            &self,
            collection: Collection,
            user_id: i64,
            recipe_id: i64,
        ) -> Result<bool, CollectionError> {
            Ok(self
                .members
                .lock()
                .unwrap()
                .remove(&(collection, user_id, recipe_id)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryCollectionStore;
    use super::*;

    #[tokio::test]
    async fn test_add_returns_short_recipe() {
        let store = MemoryCollectionStore::with_recipes(&[42]);

        let recipe = add(&store, Collection::Favorites, 1, 42).await.unwrap();
        assert_eq!(recipe.id, 42);
        assert_eq!(recipe.name, "Recipe 42");
        assert!(store.contains(Collection::Favorites, 1, 42));
    }

    #[tokio::test]
    async fn test_second_add_conflicts() {
        let store = MemoryCollectionStore::with_recipes(&[42]);

        add(&store, Collection::ShoppingCart, 1, 42).await.unwrap();
        let second = add(&store, Collection::ShoppingCart, 1, 42).await;

        assert!(matches!(
            second,
            Err(CollectionError::AlreadyPresent {
                collection: Collection::ShoppingCart,
                recipe_id: 42
            })
        ));
    }

    #[tokio::test]
    async fn test_remove_without_add_conflicts() {
        let store = MemoryCollectionStore::with_recipes(&[42]);

        let result = remove(&store, Collection::Favorites, 1, 42).await;
        assert!(matches!(result, Err(CollectionError::NotPresent { .. })));
    }

    #[tokio::test]
    async fn test_add_remove_add_cycle() {
        let store = MemoryCollectionStore::with_recipes(&[42]);

        add(&store, Collection::Favorites, 1, 42).await.unwrap();
        remove(&store, Collection::Favorites, 1, 42).await.unwrap();
        add(&store, Collection::Favorites, 1, 42).await.unwrap();

        assert!(store.contains(Collection::Favorites, 1, 42));
    }

    #[tokio::test]
    async fn test_missing_recipe_is_not_found() {
        let store = MemoryCollectionStore::with_recipes(&[]);

        assert!(matches!(
            add(&store, Collection::Favorites, 1, 7).await,
            Err(CollectionError::RecipeNotFound(7))
        ));
        assert!(matches!(
            remove(&store, Collection::ShoppingCart, 1, 7).await,
            Err(CollectionError::RecipeNotFound(7))
        ));
    }

    #[tokio::test]
    async fn test_collections_are_independent() {
        let store = MemoryCollectionStore::with_recipes(&[42]);

        add(&store, Collection::Favorites, 1, 42).await.unwrap();
        add(&store, Collection::ShoppingCart, 1, 42).await.unwrap();

        assert!(!store.contains(Collection::ShoppingCart, 2, 42));
        remove(&store, Collection::Favorites, 1, 42).await.unwrap();
        assert!(store.contains(Collection::ShoppingCart, 1, 42));
    }

    #[tokio::test]
    async fn test_users_are_independent() {
        let store = MemoryCollectionStore::with_recipes(&[42]);

        add(&store, Collection::Favorites, 1, 42).await.unwrap();
        add(&store, Collection::Favorites, 2, 42).await.unwrap();

        let result = remove(&store, Collection::Favorites, 3, 42).await;
        assert!(matches!(result, Err(CollectionError::NotPresent { .. })));
    }

    #[tokio::test]
    async fn test_deleted_recipe_drops_membership() {
        let store = MemoryCollectionStore::with_recipes(&[42]);

        add(&store, Collection::ShoppingCart, 1, 42).await.unwrap();
        store.remove_recipe(42);

        assert!(!store.contains(Collection::ShoppingCart, 1, 42));
        assert!(matches!(
            add(&store, Collection::ShoppingCart, 1, 42).await,
            Err(CollectionError::RecipeNotFound(42))
        ));
    }

    #[tokio::test]
    async fn test_deleted_user_is_reported() {
        let store = MemoryCollectionStore::with_recipes(&[42]);

        add(&store, Collection::Favorites, 1, 42).await.unwrap();
        store.remove_user(1);

        assert!(!store.contains(Collection::Favorites, 1, 42));
        assert!(matches!(
            add(&store, Collection::Favorites, 1, 42).await,
            Err(CollectionError::UserNotFound(1))
        ));
        add(&store, Collection::Favorites, 2, 42).await.unwrap();
    }

    #[test]
    fn test_user_fkey_detection() {
        assert!(is_user_fkey(Some("favorites_user_id_fkey")));
        assert!(is_user_fkey(Some("shopping_cart_user_id_fkey")));
        assert!(!is_user_fkey(Some("favorites_recipe_id_fkey")));
        assert!(!is_user_fkey(None));
    }

    #[test]
    fn test_collection_tables() {
        assert_eq!(Collection::Favorites.table(), "favorites");
        assert_eq!(Collection::ShoppingCart.table(), "shopping_cart");
    }

    #[test]
    fn test_error_messages() {
        let err = CollectionError::AlreadyPresent {
            collection: Collection::ShoppingCart,
            recipe_id: 5,
        };
        assert_eq!(err.to_string(), "Recipe 5 is already in shopping cart");

        let err = CollectionError::NotPresent {
            collection: Collection::Favorites,
            recipe_id: 5,
        };
        assert_eq!(err.to_string(), "Recipe 5 is not in favorites");
    }
}
