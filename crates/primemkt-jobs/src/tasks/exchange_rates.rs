//! Exchange-rate polling task.
//!
//! Selects enabled trading pairs, asks the price oracle for each side's USD
//! quote, and writes the pair rate plus its inverse: the latest-rate table
//! is upserted (idempotent) and one observation per symbol is appended to
//! the rate history. Runs every 15 minutes by default
//! (`PRIMEMKT_EXCHANGE_RATES_CRON` overrides).

use std::sync::Arc;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sqlx::PgPool;

use primemkt_oracle::OracleClient;

use crate::outcome::ItemOutcome;
use crate::registry::{RetryPolicy, TaskDefinition};
use crate::runner::Processor;
use crate::select::{Selection, SelectionFilter, WorkItem};

const TASK_NAME: &str = "exchange_rates";
const DEFAULT_CADENCE: &str = "0 */15 * * * *";

/// Pair rates are persisted rounded to 8 decimal places.
const RATE_DECIMALS: u32 = 8;

pub(super) fn definition(oracle: Arc<OracleClient>, batch_size: i64) -> TaskDefinition {
    let cadence = std::env::var("PRIMEMKT_EXCHANGE_RATES_CRON")
        .unwrap_or_else(|_| DEFAULT_CADENCE.to_string());

    TaskDefinition {
        name: TASK_NAME,
        cadence,
        selection: Selection {
            table: "currency_pairs",
            filter: SelectionFilter::Equals {
                column: "enabled",
                value: true,
            },
            batch_size,
        },
        // A provider outage is transient and pairs are the task's entire
        // work set; they must never be excluded permanently.
        retry: RetryPolicy::Unbounded,
        processor: Arc::new(RateProcessor { oracle }),
    }
}

struct RateProcessor {
    oracle: Arc<OracleClient>,
}

#[async_trait::async_trait]
impl Processor for RateProcessor {
    async fn process(&self, pool: &PgPool, item: &WorkItem) -> ItemOutcome {
        let pair = match primemkt_db::get_currency_pair(pool, item.id).await {
            Ok(Some(pair)) => pair,
            Ok(None) => {
                return ItemOutcome::Skipped {
                    reason: "pair deleted since selection".to_string(),
                }
            }
            Err(e) => {
                return ItemOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        let base_usd = match self.oracle.fetch_usd_price(&pair.base_currency).await {
            Ok(Some(price)) => price,
            Ok(None) => {
                return ItemOutcome::Skipped {
                    reason: format!("no quote for {}", pair.base_currency),
                }
            }
            Err(e) => {
                return ItemOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        let quote_usd = match self.oracle.fetch_usd_price(&pair.quote_currency).await {
            Ok(Some(price)) => price,
            Ok(None) => {
                return ItemOutcome::Skipped {
                    reason: format!("no quote for {}", pair.quote_currency),
                }
            }
            Err(e) => {
                return ItemOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        let Some((direct, inverse)) = compute_pair_rates(base_usd, quote_usd) else {
            return ItemOutcome::Skipped {
                reason: format!(
                    "non-positive quotes for {} ({base_usd}/{quote_usd})",
                    pair.symbol
                ),
            };
        };

        let inverse_symbol = format!("{}-{}", pair.quote_currency, pair.base_currency);

        let writes = [
            (pair.symbol.as_str(), direct),
            (inverse_symbol.as_str(), inverse),
        ];
        for (symbol, rate) in writes {
            if let Err(e) = primemkt_db::upsert_exchange_rate(pool, symbol, rate).await {
                return ItemOutcome::Failed {
                    error: e.to_string(),
                };
            }
            if let Err(e) = primemkt_db::insert_rate_history(pool, symbol, rate).await {
                return ItemOutcome::Failed {
                    error: e.to_string(),
                };
            }
        }

        tracing::info!(
            symbol = %pair.symbol,
            rate = %direct,
            inverse = %inverse,
            "scheduler: recorded pair rates"
        );
        ItemOutcome::Committed
    }
}

/// Derives the pair rate and its inverse from the two sides' USD quotes,
/// each rounded to 8 decimal places.
///
/// The direct rate is `base_usd / quote_usd`; the inverse is the reciprocal
/// of the rounded direct rate. Returns `None` when either quote is
/// non-positive or not representable.
fn compute_pair_rates(base_usd: f64, quote_usd: f64) -> Option<(Decimal, Decimal)> {
    if base_usd <= 0.0 || quote_usd <= 0.0 {
        return None;
    }

    let base = Decimal::from_f64(base_usd)?;
    let quote = Decimal::from_f64(quote_usd)?;

    let direct = (base / quote).round_dp(RATE_DECIMALS);
    if direct.is_zero() {
        return None;
    }
    let inverse = (Decimal::ONE / direct).round_dp(RATE_DECIMALS);

    Some((direct, inverse))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::run_tick;
    use std::str::FromStr;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).expect("decimal literal")
    }

    #[test]
    fn compute_pair_rates_derives_direct_and_inverse() {
        let (direct, inverse) = compute_pair_rates(1741.36, 0.1).expect("rates");
        assert_eq!(direct, dec("17413.6"));
        assert_eq!(inverse, (Decimal::ONE / dec("17413.6")).round_dp(8));
    }

    #[test]
    fn compute_pair_rates_rounds_to_eight_places() {
        let (direct, _) = compute_pair_rates(1.0, 3.0).expect("rates");
        assert_eq!(direct, dec("0.33333333"));
    }

    #[test]
    fn compute_pair_rates_rejects_non_positive_quotes() {
        assert!(compute_pair_rates(0.0, 1.0).is_none());
        assert!(compute_pair_rates(1.0, 0.0).is_none());
        assert!(compute_pair_rates(-1.0, 1.0).is_none());
    }

    async fn oracle_with_quotes(eth_usd: f64, prime_usd: f64) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/price"))
            .and(query_param("symbol", "ETH"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "symbol": "ETH",
                "usd": eth_usd,
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/price"))
            .and(query_param("symbol", "PRIME"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "symbol": "PRIME",
                "usd": prime_usd,
            })))
            .mount(&server)
            .await;
        server
    }

    fn test_definition(base_url: &str) -> TaskDefinition {
        let oracle = Arc::new(OracleClient::new(base_url, None, 5).expect("oracle client"));
        definition(oracle, 10)
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn writes_direct_and_inverse_rates_end_to_end(pool: sqlx::PgPool) {
        // The seeded ETH-PRIME pair is the work item; quotes at 1741.36 and
        // 0.1 USD must produce ETH-PRIME = 17413.6 and PRIME-ETH = 1/17413.6.
        let server = oracle_with_quotes(1741.36, 0.1).await;
        let report = run_tick(&pool, &test_definition(&server.uri())).await;

        assert_eq!(report.selected, 1);
        assert_eq!(report.committed, 1);

        let direct = primemkt_db::get_exchange_rate(&pool, "ETH-PRIME")
            .await
            .expect("get")
            .expect("direct rate written");
        assert_eq!(direct.rate, dec("17413.6"));

        let inverse = primemkt_db::get_exchange_rate(&pool, "PRIME-ETH")
            .await
            .expect("get")
            .expect("inverse rate written");
        assert_eq!(inverse.rate, (Decimal::ONE / dec("17413.6")).round_dp(8));

        let history = primemkt_db::list_rate_history(&pool, "ETH-PRIME", 10)
            .await
            .expect("history");
        assert_eq!(history.len(), 1, "one observation appended per tick");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn repeated_ticks_upsert_latest_but_append_history(pool: sqlx::PgPool) {
        let server = oracle_with_quotes(1741.36, 0.1).await;
        let def = test_definition(&server.uri());

        run_tick(&pool, &def).await;
        run_tick(&pool, &def).await;

        let latest = primemkt_db::list_exchange_rates(&pool).await.expect("list");
        assert_eq!(latest.len(), 2, "one latest row per symbol, not per tick");

        let history = primemkt_db::list_rate_history(&pool, "ETH-PRIME", 10)
            .await
            .expect("history");
        assert_eq!(history.len(), 2, "history grows by one row per tick");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn null_quote_skips_the_write(pool: sqlx::PgPool) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/price"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "symbol": "ETH",
                "usd": null,
            })))
            .mount(&server)
            .await;

        let report = run_tick(&pool, &test_definition(&server.uri())).await;
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 0);

        let latest = primemkt_db::list_exchange_rates(&pool).await.expect("list");
        assert!(latest.is_empty(), "null sentinel must skip the write");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn provider_failure_marks_the_item_failed(pool: sqlx::PgPool) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/price"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let report = run_tick(&pool, &test_definition(&server.uri())).await;
        assert_eq!(report.failed, 1);

        // Unbounded policy: the pair stays selectable on the next tick.
        let next = run_tick(&pool, &test_definition(&server.uri())).await;
        assert_eq!(next.selected, 1);
    }
}
