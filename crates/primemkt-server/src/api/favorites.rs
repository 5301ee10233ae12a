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
pub(super) struct CreateFavoriteBody {
    pub username: String,
    pub nft_id: i64,
}

#[derive(Debug, Deserialize)]
pub(super) struct ListQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct FavoriteItem {
    nft_id: i64,
    token_key: String,
    name: String,
    media_url: String,
    favorited_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(super) struct FavoriteChange {
    changed: bool,
}

async fn resolve_user(
    state: &AppState,
    req_id: &str,
    username: &str,
) -> Result<primemkt_db::UserRow, ApiError> {
    primemkt_db::get_user_by_username(&state.pool, username)
        .await
        .map_err(|e| map_db_error(req_id.to_string(), &e))?
        .ok_or_else(|| ApiError::new(req_id.to_string(), "not_found", "user not found"))
}

pub(super) async fn create_favorite(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateFavoriteBody>,
) -> Result<(StatusCode, Json<ApiResponse<FavoriteChange>>), ApiError> {
    let user = resolve_user(&state, &req_id.0, &body.username).await?;

    primemkt_db::get_nft(&state.pool, body.nft_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "nft not found"))?;

    let changed = primemkt_db::add_favorite(&state.pool, user.id, body.nft_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: FavoriteChange { changed },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

pub(super) async fn delete_favorite(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((username, nft_id)): Path<(String, i64)>,
) -> Result<Json<ApiResponse<FavoriteChange>>, ApiError> {
    let user = resolve_user(&state, &req_id.0, &username).await?;

    let changed = primemkt_db::remove_favorite(&state.pool, user.id, nft_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: FavoriteChange { changed },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn list_user_favorites(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(username): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<FavoriteItem>>>, ApiError> {
    let user = resolve_user(&state, &req_id.0, &username).await?;

    let rows = primemkt_db::list_user_favorites(&state.pool, user.id, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| FavoriteItem {
            nft_id: row.nft_id,
            token_key: row.token_key,
            name: row.name,
            media_url: row.media_url,
            favorited_at: row.favorited_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
