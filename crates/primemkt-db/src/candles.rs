//! Database operations for `candles`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `candles` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CandleRow {
    pub id: i64,
    pub symbol: String,
    pub interval: String,
    pub open_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub sample_count: i32,
    pub created_at: DateTime<Utc>,
}

/// An OHLC aggregate over one window of `rate_history`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandleAgg {
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub sample_count: i32,
}

/// Fields for appending a new candle row.
#[derive(Debug, Clone)]
pub struct NewCandle {
    pub symbol: String,
    pub interval: String,
    pub open_time: DateTime<Utc>,
    pub agg: CandleAgg,
}

#[derive(Debug, sqlx::FromRow)]
struct WindowAggRow {
    open: Option<Decimal>,
    high: Option<Decimal>,
    low: Option<Decimal>,
    close: Option<Decimal>,
    sample_count: i64,
}

/// Aggregates `rate_history` for `symbol` over `[from, to)` into OHLC values.
///
/// Returns `None` when the window contains no samples. Open/close are the
/// first/last observations ordered by `(recorded_at, id)` so same-timestamp
/// rows resolve deterministically.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn aggregate_rate_window(
    pool: &PgPool,
    symbol: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Option<CandleAgg>, DbError> {
    let row = sqlx::query_as::<_, WindowAggRow>(
        "SELECT \
             (array_agg(rate ORDER BY recorded_at ASC, id ASC))[1]   AS open, \
             MAX(rate)                                               AS high, \
             MIN(rate)                                               AS low, \
             (array_agg(rate ORDER BY recorded_at DESC, id DESC))[1] AS close, \
             COUNT(*)                                                AS sample_count \
         FROM rate_history \
         WHERE symbol = $1 AND recorded_at >= $2 AND recorded_at < $3",
    )
    .bind(symbol)
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await?;

    let (Some(open), Some(high), Some(low), Some(close)) = (row.open, row.high, row.low, row.close)
    else {
        return Ok(None);
    };

    Ok(Some(CandleAgg {
        open,
        high,
        low,
        close,
        sample_count: i32::try_from(row.sample_count).unwrap_or(i32::MAX),
    }))
}

/// Appends one candle row. Always inserts; duplicate windows produce
/// duplicate rows.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_candle(pool: &PgPool, candle: &NewCandle) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO candles (symbol, interval, open_time, open, high, low, close, sample_count) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(&candle.symbol)
    .bind(&candle.interval)
    .bind(candle.open_time)
    .bind(candle.agg.open)
    .bind(candle.agg.high)
    .bind(candle.agg.low)
    .bind(candle.agg.close)
    .bind(candle.agg.sample_count)
    .execute(pool)
    .await?;

    Ok(())
}

/// Lists candles for a symbol/interval series, newest window first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_candles(
    pool: &PgPool,
    symbol: &str,
    interval: &str,
    limit: i64,
) -> Result<Vec<CandleRow>, DbError> {
    let rows = sqlx::query_as::<_, CandleRow>(
        "SELECT id, symbol, interval, open_time, open, high, low, close, sample_count, created_at \
         FROM candles \
         WHERE symbol = $1 AND interval = $2 \
         ORDER BY open_time DESC \
         LIMIT $3",
    )
    .bind(symbol)
    .bind(interval)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).expect("decimal literal")
    }

    async fn seed_history(pool: &PgPool, symbol: &str, at: DateTime<Utc>, rate: &str) {
        sqlx::query("INSERT INTO rate_history (symbol, rate, recorded_at) VALUES ($1, $2, $3)")
            .bind(symbol)
            .bind(dec(rate))
            .bind(at)
            .execute(pool)
            .await
            .expect("seed history row");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn aggregate_computes_ohlc_in_order(pool: PgPool) {
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        seed_history(&pool, "ETH-PRIME", base, "100").await;
        seed_history(&pool, "ETH-PRIME", base + chrono::Duration::seconds(10), "140").await;
        seed_history(&pool, "ETH-PRIME", base + chrono::Duration::seconds(20), "80").await;
        seed_history(&pool, "ETH-PRIME", base + chrono::Duration::seconds(30), "120").await;

        let agg = aggregate_rate_window(
            &pool,
            "ETH-PRIME",
            base,
            base + chrono::Duration::seconds(60),
        )
        .await
        .expect("aggregate")
        .expect("window has samples");

        assert_eq!(agg.open, dec("100"));
        assert_eq!(agg.high, dec("140"));
        assert_eq!(agg.low, dec("80"));
        assert_eq!(agg.close, dec("120"));
        assert_eq!(agg.sample_count, 4);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn aggregate_returns_none_for_empty_window(pool: PgPool) {
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();

        let agg = aggregate_rate_window(
            &pool,
            "ETH-PRIME",
            base,
            base + chrono::Duration::seconds(60),
        )
        .await
        .expect("aggregate");

        assert!(agg.is_none(), "empty window must not produce a candle");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn aggregate_excludes_rows_outside_window(pool: PgPool) {
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        // One row just before the window, one inside, one at the exclusive end.
        seed_history(&pool, "ETH-PRIME", base - chrono::Duration::seconds(1), "999").await;
        seed_history(&pool, "ETH-PRIME", base + chrono::Duration::seconds(30), "100").await;
        seed_history(&pool, "ETH-PRIME", base + chrono::Duration::seconds(60), "888").await;

        let agg = aggregate_rate_window(
            &pool,
            "ETH-PRIME",
            base,
            base + chrono::Duration::seconds(60),
        )
        .await
        .expect("aggregate")
        .expect("window has samples");

        assert_eq!(agg.sample_count, 1);
        assert_eq!(agg.open, dec("100"));
        assert_eq!(agg.close, dec("100"));
    }
}
