use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct CreateUserBody {
    pub wallet_address: String,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct UserItem {
    public_id: Uuid,
    wallet_address: String,
    username: String,
    display_name: Option<String>,
    avatar_url: Option<String>,
    bio: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(super) struct UserDetail {
    #[serde(flatten)]
    user: UserItem,
    follower_count: i64,
    following_count: i64,
}

fn user_item(row: primemkt_db::UserRow) -> UserItem {
    UserItem {
        public_id: row.public_id,
        wallet_address: row.wallet_address,
        username: row.username,
        display_name: row.display_name,
        avatar_url: row.avatar_url,
        bio: row.bio,
        created_at: row.created_at,
    }
}

fn validate_create(body: &CreateUserBody) -> Result<(), &'static str> {
    if body.username.trim().is_empty() {
        return Err("username must not be empty");
    }
    if body.username.len() > 64 {
        return Err("username must be at most 64 characters");
    }
    if body.wallet_address.trim().is_empty() {
        return Err("wallet_address must not be empty");
    }
    Ok(())
}

pub(super) async fn create_user(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateUserBody>,
) -> Result<(StatusCode, Json<ApiResponse<UserItem>>), ApiError> {
    if let Err(reason) = validate_create(&body) {
        return Err(ApiError::new(req_id.0, "validation_error", reason));
    }

    let row = primemkt_db::create_user(
        &state.pool,
        &primemkt_db::NewUser {
            wallet_address: body.wallet_address,
            username: body.username,
            display_name: body.display_name,
            avatar_url: body.avatar_url,
            bio: body.bio,
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: user_item(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

pub(super) async fn get_user(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<UserDetail>>, ApiError> {
    let row = primemkt_db::get_user_by_username(&state.pool, &username)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "user not found"))?;

    let follower_count = primemkt_db::follower_count(&state.pool, row.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let following_count = primemkt_db::following_count(&state.pool, row.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: UserDetail {
            user: user_item(row),
            follower_count,
            following_count,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
