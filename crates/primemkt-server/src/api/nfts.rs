use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct CreateNftBody {
    pub token_key: String,
    pub collection_slug: String,
    pub owner_username: String,
    pub name: String,
    pub description: Option<String>,
    pub media_url: String,
    #[serde(default)]
    pub attributes: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub(super) struct ListNftsQuery {
    pub collection_slug: Option<String>,
    pub owner_username: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct NftListItem {
    id: i64,
    token_key: String,
    name: String,
    media_url: String,
    media_cid: Option<String>,
    rarity_score: Option<Decimal>,
    rarity_rank: Option<i32>,
    collection_slug: String,
    owner_username: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(super) struct NftDetail {
    id: i64,
    token_key: String,
    name: String,
    description: Option<String>,
    media_url: String,
    media_cid: Option<String>,
    media_pin_path: Option<String>,
    pinned_at: Option<DateTime<Utc>>,
    attributes: serde_json::Value,
    rarity_score: Option<Decimal>,
    rarity_rank: Option<i32>,
    favorite_count: i64,
    created_at: DateTime<Utc>,
}

pub(super) async fn create_nft(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateNftBody>,
) -> Result<(StatusCode, Json<ApiResponse<NftDetail>>), ApiError> {
    if body.token_key.trim().is_empty()
        || body.name.trim().is_empty()
        || body.media_url.trim().is_empty()
    {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "token_key, name, and media_url must not be empty",
        ));
    }
    if !body.attributes.is_object() && !body.attributes.is_null() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "attributes must be a JSON object",
        ));
    }

    let collection = primemkt_db::get_collection_by_slug(&state.pool, &body.collection_slug)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "collection not found"))?;

    let owner = primemkt_db::get_user_by_username(&state.pool, &body.owner_username)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "owner not found"))?;

    let attributes = if body.attributes.is_null() {
        serde_json::json!({})
    } else {
        body.attributes
    };

    let row = primemkt_db::create_nft(
        &state.pool,
        &primemkt_db::NewNft {
            token_key: body.token_key,
            collection_id: collection.id,
            owner_id: owner.id,
            name: body.name,
            description: body.description,
            media_url: body.media_url,
            attributes,
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: nft_detail(row, 0),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

pub(super) async fn list_nfts(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ListNftsQuery>,
) -> Result<Json<ApiResponse<Vec<NftListItem>>>, ApiError> {
    let rows = primemkt_db::list_nfts(
        &state.pool,
        primemkt_db::NftFilters {
            collection_slug: query.collection_slug.as_deref(),
            owner_username: query.owner_username.as_deref(),
            limit: normalize_limit(query.limit),
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| NftListItem {
            id: row.id,
            token_key: row.token_key,
            name: row.name,
            media_url: row.media_url,
            media_cid: row.media_cid,
            rarity_score: row.rarity_score,
            rarity_rank: row.rarity_rank,
            collection_slug: row.collection_slug,
            owner_username: row.owner_username,
            created_at: row.created_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_nft(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<NftDetail>>, ApiError> {
    let row = primemkt_db::get_nft(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "nft not found"))?;

    let favorite_count = primemkt_db::favorite_count(&state.pool, row.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: nft_detail(row, favorite_count),
        meta: ResponseMeta::new(req_id.0),
    }))
}

fn nft_detail(row: primemkt_db::NftRow, favorite_count: i64) -> NftDetail {
    NftDetail {
        id: row.id,
        token_key: row.token_key,
        name: row.name,
        description: row.description,
        media_url: row.media_url,
        media_cid: row.media_cid,
        media_pin_path: row.media_pin_path,
        pinned_at: row.pinned_at,
        attributes: row.attributes,
        rarity_score: row.rarity_score,
        rarity_rank: row.rarity_rank,
        favorite_count,
        created_at: row.created_at,
    }
}
