//! Database operations for `collections`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `collections` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CollectionRow {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub creator_id: i64,
    pub banner_url: Option<String>,
    /// `NULL` until the rarity job has scored the collection at least once.
    pub rarity_refreshed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a new collection.
#[derive(Debug, Clone)]
pub struct NewCollection {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub creator_id: i64,
    pub banner_url: Option<String>,
}

const COLLECTION_COLUMNS: &str = "id, slug, name, description, creator_id, banner_url, \
                                  rarity_refreshed_at, created_at, updated_at";

/// Creates a new collection. Slug uniqueness is enforced by the store.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_collection(
    pool: &PgPool,
    collection: &NewCollection,
) -> Result<CollectionRow, DbError> {
    let row = sqlx::query_as::<_, CollectionRow>(&format!(
        "INSERT INTO collections (slug, name, description, creator_id, banner_url) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING {COLLECTION_COLUMNS}"
    ))
    .bind(&collection.slug)
    .bind(&collection.name)
    .bind(&collection.description)
    .bind(collection.creator_id)
    .bind(&collection.banner_url)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Fetches a collection by slug, if one exists.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_collection_by_slug(
    pool: &PgPool,
    slug: &str,
) -> Result<Option<CollectionRow>, DbError> {
    let row = sqlx::query_as::<_, CollectionRow>(&format!(
        "SELECT {COLLECTION_COLUMNS} FROM collections WHERE slug = $1"
    ))
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Lists collections, newest first, up to `limit`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_collections(pool: &PgPool, limit: i64) -> Result<Vec<CollectionRow>, DbError> {
    let rows = sqlx::query_as::<_, CollectionRow>(&format!(
        "SELECT {COLLECTION_COLUMNS} FROM collections \
         ORDER BY created_at DESC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Stamps `rarity_refreshed_at = NOW()` after a successful rarity recompute.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn touch_rarity_refreshed(pool: &PgPool, collection_id: i64) -> Result<(), DbError> {
    sqlx::query("UPDATE collections SET rarity_refreshed_at = NOW(), updated_at = NOW() WHERE id = $1")
        .bind(collection_id)
        .execute(pool)
        .await?;

    Ok(())
}
