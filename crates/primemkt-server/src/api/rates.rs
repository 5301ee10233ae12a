use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use primemkt_core::CandleInterval;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct RateItem {
    symbol: String,
    rate: Decimal,
    fetched_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(super) struct HistoryQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct HistoryItem {
    rate: Decimal,
    recorded_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CandlesQuery {
    pub interval: String,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct CandleItem {
    open_time: DateTime<Utc>,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    sample_count: i32,
}

pub(super) async fn list_rates(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<RateItem>>>, ApiError> {
    let rows = primemkt_db::list_exchange_rates(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| RateItem {
            symbol: row.symbol,
            rate: row.rate,
            fetched_at: row.fetched_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn list_history(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(symbol): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<Vec<HistoryItem>>>, ApiError> {
    let rows =
        primemkt_db::list_rate_history(&state.pool, &symbol, normalize_limit(query.limit))
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| HistoryItem {
            rate: row.rate,
            recorded_at: row.recorded_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn list_candles(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(symbol): Path<String>,
    Query(query): Query<CandlesQuery>,
) -> Result<Json<ApiResponse<Vec<CandleItem>>>, ApiError> {
    let interval: CandleInterval = query
        .interval
        .parse()
        .map_err(|reason: String| ApiError::new(req_id.0.clone(), "validation_error", reason))?;

    let rows = primemkt_db::list_candles(
        &state.pool,
        &symbol,
        interval.label(),
        normalize_limit(query.limit),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| CandleItem {
            open_time: row.open_time,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            sample_count: row.sample_count,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
