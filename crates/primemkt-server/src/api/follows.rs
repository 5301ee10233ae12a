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
pub(super) struct CreateFollowBody {
    pub follower_username: String,
    pub followed_username: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct ListQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct FollowChange {
    changed: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct FollowerItem {
    username: String,
    display_name: Option<String>,
    followed_at: DateTime<Utc>,
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

pub(super) async fn create_follow(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateFollowBody>,
) -> Result<(StatusCode, Json<ApiResponse<FollowChange>>), ApiError> {
    if body.follower_username == body.followed_username {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "users cannot follow themselves",
        ));
    }

    let follower = resolve_user(&state, &req_id.0, &body.follower_username).await?;
    let followed = resolve_user(&state, &req_id.0, &body.followed_username).await?;

    let changed = primemkt_db::add_follow(&state.pool, follower.id, followed.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: FollowChange { changed },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

pub(super) async fn delete_follow(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((follower_username, followed_username)): Path<(String, String)>,
) -> Result<Json<ApiResponse<FollowChange>>, ApiError> {
    let follower = resolve_user(&state, &req_id.0, &follower_username).await?;
    let followed = resolve_user(&state, &req_id.0, &followed_username).await?;

    let changed = primemkt_db::remove_follow(&state.pool, follower.id, followed.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: FollowChange { changed },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn list_followers(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(username): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<FollowerItem>>>, ApiError> {
    let user = resolve_user(&state, &req_id.0, &username).await?;

    let rows = primemkt_db::list_followers(&state.pool, user.id, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| FollowerItem {
            username: row.username,
            display_name: row.display_name,
            followed_at: row.followed_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
