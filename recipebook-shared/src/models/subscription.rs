/// Author subscriptions
///
/// A subscription is a `(subscriber, target)` pair; the primary key makes it
/// a set. Self-subscription is rejected by the request layer, not here.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE subscriptions (
///     subscriber_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     target_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (subscriber_id, target_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::user::UserView;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subscription {
    pub subscriber_id: i64,
    pub target_id: i64,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// Subscribes `subscriber_id` to `target_id`
    ///
    /// Returns `None` when the subscription already exists.
    pub async fn create(
        pool: &PgPool,
        subscriber_id: i64,
        target_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions (subscriber_id, target_id)
            VALUES ($1, $2)
            ON CONFLICT (subscriber_id, target_id) DO NOTHING
            RETURNING subscriber_id, target_id, created_at
            "#,
        )
        .bind(subscriber_id)
        .bind(target_id)
        .fetch_optional(pool)
        .await
    }

    /// Returns false if there was nothing to delete
    pub async fn delete(
        pool: &PgPool,
        subscriber_id: i64,
        target_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM subscriptions WHERE subscriber_id = $1 AND target_id = $2")
                .bind(subscriber_id)
                .bind(target_id)
                .execute(pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn exists(
        pool: &PgPool,
        subscriber_id: i64,
        target_id: i64,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM subscriptions WHERE subscriber_id = $1 AND target_id = $2)",
        )
        .bind(subscriber_id)
        .bind(target_id)
        .fetch_one(pool)
        .await
    }

    /// Authors the subscriber follows, most recently followed first
    pub async fn list_targets(
        pool: &PgPool,
        subscriber_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<UserView>, sqlx::Error> {
        sqlx::query_as::<_, UserView>(
            r#"
            SELECT u.id, u.email, u.username, u.first_name, u.last_name, u.avatar,
                   TRUE AS is_subscribed
            FROM subscriptions s
            JOIN users u ON u.id = s.target_id
            WHERE s.subscriber_id = $1
            ORDER BY s.created_at DESC, u.id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(subscriber_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    pub async fn count_targets(pool: &PgPool, subscriber_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions WHERE subscriber_id = $1")
            .bind(subscriber_id)
            .fetch_one(pool)
            .await
    }
}
