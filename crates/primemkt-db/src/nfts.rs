//! Database operations for `nfts`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `nfts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NftRow {
    pub id: i64,
    pub token_key: String,
    pub collection_id: i64,
    pub owner_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub media_url: String,
    /// `NULL` marks the item as not yet pinned; set by the pinning job.
    pub media_cid: Option<String>,
    pub media_pin_path: Option<String>,
    pub pinned_at: Option<DateTime<Utc>>,
    pub attributes: serde_json::Value,
    pub rarity_score: Option<Decimal>,
    pub rarity_rank: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A listing row: NFT plus the collection slug and owner username it joins to.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NftListRow {
    pub id: i64,
    pub token_key: String,
    pub name: String,
    pub media_url: String,
    pub media_cid: Option<String>,
    pub rarity_score: Option<Decimal>,
    pub rarity_rank: Option<i32>,
    pub collection_slug: String,
    pub owner_username: String,
    pub created_at: DateTime<Utc>,
}

/// The id/attributes projection the rarity job scores from.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NftAttributeRow {
    pub id: i64,
    pub attributes: serde_json::Value,
}

/// Fields for minting a new NFT record.
#[derive(Debug, Clone)]
pub struct NewNft {
    pub token_key: String,
    pub collection_id: i64,
    pub owner_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub media_url: String,
    pub attributes: serde_json::Value,
}

/// Optional filters for [`list_nfts`].
#[derive(Debug, Clone, Default)]
pub struct NftFilters<'a> {
    pub collection_slug: Option<&'a str>,
    pub owner_username: Option<&'a str>,
    pub limit: i64,
}

const NFT_COLUMNS: &str = "id, token_key, collection_id, owner_id, name, description, \
                           media_url, media_cid, media_pin_path, pinned_at, attributes, \
                           rarity_score, rarity_rank, created_at, updated_at";

// ---------------------------------------------------------------------------
// nfts operations
// ---------------------------------------------------------------------------

/// Creates a new NFT record.
///
/// `(collection_id, token_key)` uniqueness is enforced by the store;
/// duplicates surface as a unique-constraint violation.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_nft(pool: &PgPool, nft: &NewNft) -> Result<NftRow, DbError> {
    let row = sqlx::query_as::<_, NftRow>(&format!(
        "INSERT INTO nfts (token_key, collection_id, owner_id, name, description, media_url, attributes) \
         VALUES ($1, $2, $3, $4, $5, $6, $7::jsonb) \
         RETURNING {NFT_COLUMNS}"
    ))
    .bind(&nft.token_key)
    .bind(nft.collection_id)
    .bind(nft.owner_id)
    .bind(&nft.name)
    .bind(&nft.description)
    .bind(&nft.media_url)
    .bind(&nft.attributes)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Fetches an NFT by internal id, if one exists.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_nft(pool: &PgPool, id: i64) -> Result<Option<NftRow>, DbError> {
    let row = sqlx::query_as::<_, NftRow>(&format!("SELECT {NFT_COLUMNS} FROM nfts WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Lists NFTs newest-first with optional collection/owner filters.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_nfts(pool: &PgPool, filters: NftFilters<'_>) -> Result<Vec<NftListRow>, DbError> {
    let rows = sqlx::query_as::<_, NftListRow>(
        "SELECT n.id, n.token_key, n.name, n.media_url, n.media_cid, \
                n.rarity_score, n.rarity_rank, \
                c.slug AS collection_slug, u.username AS owner_username, \
                n.created_at \
         FROM nfts n \
         JOIN collections c ON c.id = n.collection_id \
         JOIN users u ON u.id = n.owner_id \
         WHERE ($1::text IS NULL OR c.slug = $1) \
           AND ($2::text IS NULL OR u.username = $2) \
         ORDER BY n.created_at DESC \
         LIMIT $3",
    )
    .bind(filters.collection_slug)
    .bind(filters.owner_username)
    .bind(filters.limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Records a pinning result: content id, pin path, and the pin timestamp.
///
/// Idempotent — re-applying the same result leaves the row in the same
/// state apart from the timestamps. Returns `true` if a row was updated.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn set_nft_pin(
    pool: &PgPool,
    id: i64,
    media_cid: &str,
    media_pin_path: &str,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE nfts \
         SET media_cid = $2, media_pin_path = $3, pinned_at = NOW(), updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(media_cid)
    .bind(media_pin_path)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Loads every NFT's attributes for one collection, for rarity scoring.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_nft_attribute_rows(
    pool: &PgPool,
    collection_id: i64,
) -> Result<Vec<NftAttributeRow>, DbError> {
    let rows = sqlx::query_as::<_, NftAttributeRow>(
        "SELECT id, attributes FROM nfts WHERE collection_id = $1 ORDER BY id",
    )
    .bind(collection_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Writes a recomputed rarity score and rank for one NFT.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn update_nft_rarity(
    pool: &PgPool,
    id: i64,
    score: Decimal,
    rank: i32,
) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE nfts \
         SET rarity_score = $2, rarity_rank = $3, updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(score)
    .bind(rank)
    .execute(pool)
    .await?;

    Ok(())
}
