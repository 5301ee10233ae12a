use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct CreateLogBody {
    pub actor_username: String,
    pub action: String,
    pub target_kind: String,
    pub target_id: i64,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ListQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct ModerationLogItem {
    id: i64,
    actor_id: i64,
    action: String,
    target_kind: String,
    target_id: i64,
    reason: Option<String>,
    created_at: DateTime<Utc>,
}

fn log_item(row: primemkt_db::ModerationLogRow) -> ModerationLogItem {
    ModerationLogItem {
        id: row.id,
        actor_id: row.actor_id,
        action: row.action,
        target_kind: row.target_kind,
        target_id: row.target_id,
        reason: row.reason,
        created_at: row.created_at,
    }
}

pub(super) async fn create_log(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateLogBody>,
) -> Result<(StatusCode, Json<ApiResponse<ModerationLogItem>>), ApiError> {
    if body.action.trim().is_empty() || body.target_kind.trim().is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "action and target_kind must not be empty",
        ));
    }

    let actor = primemkt_db::get_user_by_username(&state.pool, &body.actor_username)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "actor not found"))?;

    if !actor.is_admin {
        return Err(ApiError::new(
            req_id.0,
            "unauthorized",
            "actor is not an admin",
        ));
    }

    let row = primemkt_db::insert_moderation_log(
        &state.pool,
        actor.id,
        &body.action,
        &body.target_kind,
        body.target_id,
        body.reason.as_deref(),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: log_item(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

pub(super) async fn list_logs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<ModerationLogItem>>>, ApiError> {
    let rows = primemkt_db::list_moderation_logs(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(log_item).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}
