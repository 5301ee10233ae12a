//! Candle aggregation tasks.
//!
//! One task per interval (`candles_1m` … `candles_1d`), each firing at the
//! close of its window. A tick selects the enabled trading pairs and, per
//! pair, aggregates the previous fully-closed window of `rate_history`
//! into one append-only OHLC row. Windows with no samples produce no
//! candle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use primemkt_core::CandleInterval;
use primemkt_db::NewCandle;

use crate::outcome::ItemOutcome;
use crate::registry::{RetryPolicy, TaskDefinition};
use crate::runner::Processor;
use crate::select::{Selection, SelectionFilter, WorkItem};

pub(super) fn definition(interval: CandleInterval, batch_size: i64) -> TaskDefinition {
    TaskDefinition {
        name: task_name(interval),
        cadence: interval.default_cadence().to_string(),
        selection: Selection {
            table: "currency_pairs",
            filter: SelectionFilter::Equals {
                column: "enabled",
                value: true,
            },
            batch_size,
        },
        retry: RetryPolicy::Unbounded,
        processor: Arc::new(CandleProcessor { interval }),
    }
}

const fn task_name(interval: CandleInterval) -> &'static str {
    match interval {
        CandleInterval::OneMinute => "candles_1m",
        CandleInterval::FiveMinutes => "candles_5m",
        CandleInterval::ThirtyMinutes => "candles_30m",
        CandleInterval::Hourly => "candles_1h",
        CandleInterval::Daily => "candles_1d",
    }
}

struct CandleProcessor {
    interval: CandleInterval,
}

#[async_trait::async_trait]
impl Processor for CandleProcessor {
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

        let (from, to) = window_bounds(Utc::now(), self.interval.secs());

        let agg = match primemkt_db::aggregate_rate_window(pool, &pair.symbol, from, to).await {
            Ok(Some(agg)) => agg,
            Ok(None) => {
                return ItemOutcome::Skipped {
                    reason: format!("no samples in the {} window", self.interval),
                }
            }
            Err(e) => {
                return ItemOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        let candle = NewCandle {
            symbol: pair.symbol.clone(),
            interval: self.interval.label().to_string(),
            open_time: from,
            agg,
        };

        match primemkt_db::insert_candle(pool, &candle).await {
            Ok(()) => {
                tracing::info!(
                    symbol = %pair.symbol,
                    interval = %self.interval,
                    open_time = %from,
                    "scheduler: candle recorded"
                );
                ItemOutcome::Committed
            }
            Err(e) => ItemOutcome::Failed {
                error: e.to_string(),
            },
        }
    }
}

/// Bounds of the previous fully-closed window of `window_secs` before
/// `now`, aligned to the epoch: `[end - window, end)` where `end` is `now`
/// truncated to the window boundary.
fn window_bounds(now: DateTime<Utc>, window_secs: i64) -> (DateTime<Utc>, DateTime<Utc>) {
    let ts = now.timestamp();
    let end = ts - ts.rem_euclid(window_secs);
    let from = DateTime::from_timestamp(end - window_secs, 0)
        .expect("window start is a valid epoch second");
    let to = DateTime::from_timestamp(end, 0).expect("window end is a valid epoch second");
    (from, to)
}
