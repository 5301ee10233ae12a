//! Shared seeding helpers for DB-backed job tests.

use sqlx::PgPool;
use uuid::Uuid;

/// Inserts one user and one collection owned by them; returns both ids.
pub(crate) async fn seed_user_and_collection(pool: &PgPool) -> (i64, i64) {
    let user_id: i64 = sqlx::query_scalar(
        "INSERT INTO users (public_id, wallet_address, username) \
         VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(format!("0x{}", Uuid::new_v4().simple()))
    .bind(format!("user-{}", Uuid::new_v4().simple()))
    .fetch_one(pool)
    .await
    .expect("seed user");

    let collection_id: i64 = sqlx::query_scalar(
        "INSERT INTO collections (slug, name, creator_id) \
         VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(format!("col-{}", Uuid::new_v4().simple()))
    .bind("Test Collection")
    .bind(user_id)
    .fetch_one(pool)
    .await
    .expect("seed collection");

    (user_id, collection_id)
}

/// Inserts an unpinned NFT whose `created_at` increases with `index`, so
/// selection order in tests is deterministic. Returns the NFT id.
pub(crate) async fn seed_unpinned_nft(
    pool: &PgPool,
    collection_id: i64,
    owner_id: i64,
    index: i64,
) -> i64 {
    seed_unpinned_nft_with_attributes(
        pool,
        collection_id,
        owner_id,
        index,
        serde_json::json!({}),
    )
    .await
}

/// As [`seed_unpinned_nft`], with explicit trait attributes.
pub(crate) async fn seed_unpinned_nft_with_attributes(
    pool: &PgPool,
    collection_id: i64,
    owner_id: i64,
    index: i64,
    attributes: serde_json::Value,
) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO nfts \
             (token_key, collection_id, owner_id, name, media_url, attributes, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6::jsonb, NOW() + ($7 * interval '1 second')) \
         RETURNING id",
    )
    .bind(format!("token-{index}"))
    .bind(collection_id)
    .bind(owner_id)
    .bind(format!("NFT #{index}"))
    .bind(format!("https://cdn.example.com/art/{index}.png"))
    .bind(attributes)
    .bind(index)
    .fetch_one(pool)
    .await
    .expect("seed nft")
}
