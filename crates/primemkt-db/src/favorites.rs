//! Database operations for `favorites`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A favorited NFT as returned by [`list_user_favorites`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FavoriteNftRow {
    pub nft_id: i64,
    pub token_key: String,
    pub name: String,
    pub media_url: String,
    pub favorited_at: DateTime<Utc>,
}

/// Marks an NFT as a favorite of the user.
///
/// Returns `true` if the favorite was created, `false` if it already existed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn add_favorite(pool: &PgPool, user_id: i64, nft_id: i64) -> Result<bool, DbError> {
    let result = sqlx::query(
        "INSERT INTO favorites (user_id, nft_id) VALUES ($1, $2) \
         ON CONFLICT (user_id, nft_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(nft_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Removes a favorite. Returns `true` if a row was deleted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn remove_favorite(pool: &PgPool, user_id: i64, nft_id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND nft_id = $2")
        .bind(user_id)
        .bind(nft_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Counts how many users have favorited the NFT.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn favorite_count(pool: &PgPool, nft_id: i64) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM favorites WHERE nft_id = $1")
        .bind(nft_id)
        .fetch_one(pool)
        .await?;

    Ok(count)
}

/// Lists a user's favorites, most recently favorited first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_user_favorites(
    pool: &PgPool,
    user_id: i64,
    limit: i64,
) -> Result<Vec<FavoriteNftRow>, DbError> {
    let rows = sqlx::query_as::<_, FavoriteNftRow>(
        "SELECT n.id AS nft_id, n.token_key, n.name, n.media_url, f.created_at AS favorited_at \
         FROM favorites f \
         JOIN nfts n ON n.id = f.nft_id \
         WHERE f.user_id = $1 \
         ORDER BY f.created_at DESC \
         LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
