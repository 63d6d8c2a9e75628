/// User model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id BIGSERIAL PRIMARY KEY,
///     email VARCHAR(254) NOT NULL UNIQUE,
///     username VARCHAR(150) NOT NULL UNIQUE,
///     first_name VARCHAR(150) NOT NULL,
///     last_name VARCHAR(150) NOT NULL,
///     password_hash VARCHAR(255) NOT NULL,
///     avatar TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use recipebook_shared::models::user::{CreateUser, User};
/// use recipebook_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     email: "cook@example.com".to_string(),
///     username: "cook".to_string(),
///     first_name: "Julia".to_string(),
///     last_name: "Child".to_string(),
///     password_hash: "$argon2id$...".to_string(),
/// }).await?;
///
/// let found = User::find_by_email(&pool, "cook@example.com").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

const USER_COLUMNS: &str =
    "id, email, username, first_name, last_name, password_hash, avatar, created_at";

/// A registered user
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,

    /// Unique email, used to log in
    pub email: String,

    /// Unique public handle
    pub username: String,

    pub first_name: String,

    pub last_name: String,

    /// Argon2id hash; never serialized to clients
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Avatar reference (data URI or URL) as submitted
    pub avatar: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// A user as seen by a (possibly anonymous) viewer
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserView {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,

    /// Whether the viewer follows this user (false for anonymous viewers)
    pub is_subscribed: bool,
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,

    /// Argon2id hash (NOT the plaintext password)
    pub password_hash: String,
}

impl User {
    /// Inserts a new user
    ///
    /// # Errors
    ///
    /// Fails with a unique violation on `users_email_key` or
    /// `users_username_key` when the email or username is taken.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO users (email, username, first_name, last_name, password_hash)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(data.email)
            .bind(data.username)
            .bind(data.first_name)
            .bind(data.last_name)
            .bind(data.password_hash)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Case-insensitive lookup by email
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");

        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    pub async fn exists(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// Replaces the password hash
    pub async fn update_password(
        pool: &PgPool,
        id: i64,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Sets or clears (with `None`) the avatar reference
    pub async fn set_avatar(
        pool: &PgPool,
        id: i64,
        avatar: Option<&str>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("UPDATE users SET avatar = $2 WHERE id = $1 RETURNING {USER_COLUMNS}");

        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(avatar)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await
    }

    /// Projects this user for a viewer
    pub fn view(&self, is_subscribed: bool) -> UserView {
        UserView {
            id: self.id,
            email: self.email.clone(),
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            avatar: self.avatar.clone(),
            is_subscribed,
        }
    }
}

impl UserView {
    /// Fetches one user with the viewer's subscription flag
    pub async fn find(
        pool: &PgPool,
        id: i64,
        viewer: Option<i64>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserView>(
            r#"
            SELECT u.id, u.email, u.username, u.first_name, u.last_name, u.avatar,
                   EXISTS(
                       SELECT 1 FROM subscriptions s
                       WHERE s.subscriber_id = $2 AND s.target_id = u.id
                   ) AS is_subscribed
            FROM users u
            WHERE u.id = $1
            "#,
        )
        .bind(id)
        .bind(viewer)
        .fetch_optional(pool)
        .await
    }

    /// Lists users ordered by id, one page at a time
    pub async fn list(
        pool: &PgPool,
        viewer: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserView>(
            r#"
            SELECT u.id, u.email, u.username, u.first_name, u.last_name, u.avatar,
                   EXISTS(
                       SELECT 1 FROM subscriptions s
                       WHERE s.subscriber_id = $1 AND s.target_id = u.id
                   ) AS is_subscribed
            FROM users u
            ORDER BY u.id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(viewer)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }
}
