//! Database operations for `currency_pairs`, `exchange_rates`, and
//! `rate_history`.
//!
//! `exchange_rates` holds the latest rate per symbol and is written via an
//! idempotent upsert. `rate_history` is append-only; repeated writes of the
//! same observation produce duplicate rows by design.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `currency_pairs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CurrencyPairRow {
    pub id: i64,
    pub symbol: String,
    pub base_currency: String,
    pub quote_currency: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

/// A row from the `exchange_rates` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ExchangeRateRow {
    pub symbol: String,
    pub rate: Decimal,
    pub fetched_at: DateTime<Utc>,
}

/// A row from the `rate_history` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RateHistoryRow {
    pub id: i64,
    pub symbol: String,
    pub rate: Decimal,
    pub recorded_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// currency_pairs operations
// ---------------------------------------------------------------------------

/// Fetches a tracked trading pair by internal id, if one exists.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_currency_pair(pool: &PgPool, id: i64) -> Result<Option<CurrencyPairRow>, DbError> {
    let row = sqlx::query_as::<_, CurrencyPairRow>(
        "SELECT id, symbol, base_currency, quote_currency, enabled, created_at \
         FROM currency_pairs WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

// ---------------------------------------------------------------------------
// exchange_rates operations
// ---------------------------------------------------------------------------

/// Upserts the latest rate for a symbol.
///
/// Conflicts on `symbol` overwrite `rate` and `fetched_at` in place —
/// applying the same `(symbol, rate)` twice leaves the store in the same
/// state as applying it once.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_exchange_rate(pool: &PgPool, symbol: &str, rate: Decimal) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO exchange_rates (symbol, rate, fetched_at) \
         VALUES ($1, $2, NOW()) \
         ON CONFLICT (symbol) DO UPDATE SET \
             rate       = EXCLUDED.rate, \
             fetched_at = NOW()",
    )
    .bind(symbol)
    .bind(rate)
    .execute(pool)
    .await?;

    Ok(())
}

/// Fetches the latest rate for one symbol, if recorded.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_exchange_rate(
    pool: &PgPool,
    symbol: &str,
) -> Result<Option<ExchangeRateRow>, DbError> {
    let row = sqlx::query_as::<_, ExchangeRateRow>(
        "SELECT symbol, rate, fetched_at FROM exchange_rates WHERE symbol = $1",
    )
    .bind(symbol)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Lists the latest rate for every symbol, alphabetically.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_exchange_rates(pool: &PgPool) -> Result<Vec<ExchangeRateRow>, DbError> {
    let rows = sqlx::query_as::<_, ExchangeRateRow>(
        "SELECT symbol, rate, fetched_at FROM exchange_rates ORDER BY symbol",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

// ---------------------------------------------------------------------------
// rate_history operations
// ---------------------------------------------------------------------------

/// Appends one observation to the rate history.
///
/// Always inserts; duplicate observations produce duplicate rows.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_rate_history(pool: &PgPool, symbol: &str, rate: Decimal) -> Result<(), DbError> {
    sqlx::query("INSERT INTO rate_history (symbol, rate) VALUES ($1, $2)")
        .bind(symbol)
        .bind(rate)
        .execute(pool)
        .await?;

    Ok(())
}

/// Lists history rows for a symbol, newest first, up to `limit`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_rate_history(
    pool: &PgPool,
    symbol: &str,
    limit: i64,
) -> Result<Vec<RateHistoryRow>, DbError> {
    let rows = sqlx::query_as::<_, RateHistoryRow>(
        "SELECT id, symbol, rate, recorded_at \
         FROM rate_history \
         WHERE symbol = $1 \
         ORDER BY recorded_at DESC, id DESC \
         LIMIT $2",
    )
    .bind(symbol)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).expect("decimal literal")
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn upsert_exchange_rate_is_idempotent(pool: PgPool) {
        upsert_exchange_rate(&pool, "ETH-PRIME", dec("17413.6"))
            .await
            .expect("first upsert");
        upsert_exchange_rate(&pool, "ETH-PRIME", dec("17413.6"))
            .await
            .expect("second upsert");

        let rows = list_exchange_rates(&pool).await.expect("list");
        assert_eq!(rows.len(), 1, "upsert must not duplicate the symbol row");
        assert_eq!(rows[0].rate, dec("17413.6"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn upsert_exchange_rate_overwrites_rate(pool: PgPool) {
        upsert_exchange_rate(&pool, "ETH-PRIME", dec("17413.6"))
            .await
            .expect("first upsert");
        upsert_exchange_rate(&pool, "ETH-PRIME", dec("17500.0"))
            .await
            .expect("second upsert");

        let row = get_exchange_rate(&pool, "ETH-PRIME")
            .await
            .expect("get")
            .expect("row exists");
        assert_eq!(row.rate, dec("17500.0"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn rate_history_appends_duplicates(pool: PgPool) {
        insert_rate_history(&pool, "ETH-PRIME", dec("17413.6"))
            .await
            .expect("first insert");
        insert_rate_history(&pool, "ETH-PRIME", dec("17413.6"))
            .await
            .expect("second insert");

        let rows = list_rate_history(&pool, "ETH-PRIME", 10).await.expect("list");
        assert_eq!(rows.len(), 2, "append-only path must insert both rows");
    }
}
