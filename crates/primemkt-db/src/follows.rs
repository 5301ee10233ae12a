//! Database operations for `follows`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A follower as returned by [`list_followers`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FollowerRow {
    pub username: String,
    pub display_name: Option<String>,
    pub followed_at: DateTime<Utc>,
}

/// Records that `follower_id` follows `followed_id`.
///
/// Returns `true` if the follow was created, `false` if it already existed.
/// Self-follows are rejected by a store-level check constraint.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn add_follow(pool: &PgPool, follower_id: i64, followed_id: i64) -> Result<bool, DbError> {
    let result = sqlx::query(
        "INSERT INTO follows (follower_id, followed_id) VALUES ($1, $2) \
         ON CONFLICT (follower_id, followed_id) DO NOTHING",
    )
    .bind(follower_id)
    .bind(followed_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Removes a follow edge. Returns `true` if a row was deleted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn remove_follow(
    pool: &PgPool,
    follower_id: i64,
    followed_id: i64,
) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followed_id = $2")
        .bind(follower_id)
        .bind(followed_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Counts users following `user_id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn follower_count(pool: &PgPool, user_id: i64) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM follows WHERE followed_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    Ok(count)
}

/// Counts users that `user_id` follows.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn following_count(pool: &PgPool, user_id: i64) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM follows WHERE follower_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    Ok(count)
}

/// Lists the user's followers, most recent first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_followers(
    pool: &PgPool,
    user_id: i64,
    limit: i64,
) -> Result<Vec<FollowerRow>, DbError> {
    let rows = sqlx::query_as::<_, FollowerRow>(
        "SELECT u.username, u.display_name, f.created_at AS followed_at \
         FROM follows f \
         JOIN users u ON u.id = f.follower_id \
         WHERE f.followed_id = $1 \
         ORDER BY f.created_at DESC \
         LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
