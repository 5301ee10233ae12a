use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct CreateCollectionBody {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub creator_username: String,
    pub banner_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ListQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct CollectionItem {
    slug: String,
    name: String,
    description: Option<String>,
    banner_url: Option<String>,
    rarity_refreshed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

fn collection_item(row: primemkt_db::CollectionRow) -> CollectionItem {
    CollectionItem {
        slug: row.slug,
        name: row.name,
        description: row.description,
        banner_url: row.banner_url,
        rarity_refreshed_at: row.rarity_refreshed_at,
        created_at: row.created_at,
    }
}

pub(super) async fn create_collection(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateCollectionBody>,
) -> Result<(StatusCode, Json<ApiResponse<CollectionItem>>), ApiError> {
    if body.slug.trim().is_empty() || body.name.trim().is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "slug and name must not be empty",
        ));
    }

    let creator = primemkt_db::get_user_by_username(&state.pool, &body.creator_username)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "creator not found"))?;

    let row = primemkt_db::create_collection(
        &state.pool,
        &primemkt_db::NewCollection {
            slug: body.slug,
            name: body.name,
            description: body.description,
            creator_id: creator.id,
            banner_url: body.banner_url,
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: collection_item(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

pub(super) async fn list_collections(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<CollectionItem>>>, ApiError> {
    let rows = primemkt_db::list_collections(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(collection_item).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_collection(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<CollectionItem>>, ApiError> {
    let row = primemkt_db::get_collection_by_slug(&state.pool, &slug)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "collection not found"))?;

    Ok(Json(ApiResponse {
        data: collection_item(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}
