//! Rarity recomputation task.
//!
//! Selects collections whose scores are stale, recomputes every member
//! NFT's rarity from the full current trait population, and stamps the
//! collection when the write-back completes. Runs hourly by default
//! (`PRIMEMKT_RARITY_CRON` overrides).

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use sqlx::PgPool;

use primemkt_db::NftAttributeRow;

use crate::outcome::ItemOutcome;
use crate::registry::{RetryPolicy, TaskDefinition};
use crate::runner::Processor;
use crate::select::{Selection, SelectionFilter, WorkItem};

const TASK_NAME: &str = "rarity";
const DEFAULT_CADENCE: &str = "0 0 * * * *";

/// Re-score any collection not refreshed in the last 50 minutes, so each
/// hourly tick picks up everything scored on the previous one.
const STALE_AFTER_SECS: i64 = 3_000;

/// Scores are persisted rounded to the store's 6-decimal scale.
const SCORE_DECIMALS: u32 = 6;

pub(super) fn definition(batch_size: i64) -> TaskDefinition {
    let cadence =
        std::env::var("PRIMEMKT_RARITY_CRON").unwrap_or_else(|_| DEFAULT_CADENCE.to_string());

    TaskDefinition {
        name: TASK_NAME,
        cadence,
        selection: Selection {
            table: "collections",
            filter: SelectionFilter::StaleAfter {
                column: "rarity_refreshed_at",
                max_age_secs: STALE_AFTER_SECS,
            },
            batch_size,
        },
        retry: RetryPolicy::Unbounded,
        processor: Arc::new(RarityProcessor),
    }
}

struct RarityProcessor;

#[async_trait::async_trait]
impl Processor for RarityProcessor {
    async fn process(&self, pool: &PgPool, item: &WorkItem) -> ItemOutcome {
        let rows = match primemkt_db::list_nft_attribute_rows(pool, item.id).await {
            Ok(rows) => rows,
            Err(e) => {
                return ItemOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        if rows.is_empty() {
            // Stamp empty collections too, so they drop out of selection
            // until the staleness window passes again.
            if let Err(e) = primemkt_db::touch_rarity_refreshed(pool, item.id).await {
                return ItemOutcome::Failed {
                    error: e.to_string(),
                };
            }
            return ItemOutcome::Skipped {
                reason: "collection has no items".to_string(),
            };
        }

        let ranked = score_collection(&rows);
        let item_count = ranked.len();

        for (nft_id, score, rank) in ranked {
            if let Err(e) = primemkt_db::update_nft_rarity(pool, nft_id, score, rank).await {
                // The collection stays stale, so the next tick re-runs the
                // whole recompute rather than leaving a half-scored set.
                return ItemOutcome::Failed {
                    error: e.to_string(),
                };
            }
        }

        if let Err(e) = primemkt_db::touch_rarity_refreshed(pool, item.id).await {
            return ItemOutcome::Failed {
                error: e.to_string(),
            };
        }

        tracing::info!(
            collection_id = item.id,
            items = item_count,
            "scheduler: rarity recomputed"
        );
        ItemOutcome::Committed
    }
}

/// Scores every NFT against the collection's current trait population and
/// assigns dense 1-based ranks, highest score first.
///
/// Each `(trait, value)` pair contributes `population / frequency` to the
/// score: the rarer the pair, the larger its contribution. Items without an
/// attribute object score zero. Ties rank by NFT id for determinism.
fn score_collection(rows: &[NftAttributeRow]) -> Vec<(i64, Decimal, i32)> {
    let population = Decimal::from(rows.len());

    let mut frequencies: HashMap<(String, String), i64> = HashMap::new();
    for row in rows {
        for (name, value) in trait_pairs(&row.attributes) {
            *frequencies.entry((name, value)).or_insert(0) += 1;
        }
    }

    let mut scored: Vec<(i64, Decimal)> = rows
        .iter()
        .map(|row| {
            let score: Decimal = trait_pairs(&row.attributes)
                .into_iter()
                .map(|pair| {
                    let count = frequencies.get(&pair).copied().unwrap_or(1);
                    population / Decimal::from(count)
                })
                .sum();
            (row.id, score.round_dp(SCORE_DECIMALS))
        })
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    scored
        .into_iter()
        .enumerate()
        .map(|(i, (id, score))| {
            let rank = i32::try_from(i + 1).unwrap_or(i32::MAX);
            (id, score, rank)
        })
        .collect()
}

/// Flattens an attribute object into `(trait, value)` string pairs.
///
/// Non-object attribute payloads contribute no traits.
fn trait_pairs(attributes: &serde_json::Value) -> Vec<(String, String)> {
    let Some(object) = attributes.as_object() else {
        return Vec::new();
    };

    object
        .iter()
        .map(|(name, value)| {
            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (name.clone(), rendered)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::run_tick;
    use crate::testutil;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).expect("decimal literal")
    }

    fn row(id: i64, attributes: serde_json::Value) -> NftAttributeRow {
        NftAttributeRow { id, attributes }
    }

    #[test]
    fn rarer_traits_score_higher() {
        // Three items: background gold appears once, blue twice.
        let rows = vec![
            row(1, serde_json::json!({"background": "gold"})),
            row(2, serde_json::json!({"background": "blue"})),
            row(3, serde_json::json!({"background": "blue"})),
        ];

        let ranked = score_collection(&rows);
        assert_eq!(ranked[0], (1, dec("3"), 1), "unique trait ranks first");
        assert_eq!(ranked[1].2, 2);
        assert_eq!(ranked[2].2, 3);
        assert_eq!(ranked[1].1, dec("1.5"));
    }

    #[test]
    fn scores_sum_across_traits() {
        let rows = vec![
            row(1, serde_json::json!({"background": "gold", "eyes": "laser"})),
            row(2, serde_json::json!({"background": "gold", "eyes": "plain"})),
        ];

        let ranked = score_collection(&rows);
        // Shared background contributes 1 each; unique eyes contribute 2 each.
        assert_eq!(ranked[0].1, dec("3"));
        assert_eq!(ranked[1].1, dec("3"));
        // Equal scores tie-break by id.
        assert_eq!(ranked[0].0, 1);
        assert_eq!(ranked[1].0, 2);
    }

    #[test]
    fn items_without_attributes_score_zero() {
        let rows = vec![
            row(1, serde_json::json!({"background": "gold"})),
            row(2, serde_json::json!(null)),
        ];

        let ranked = score_collection(&rows);
        assert_eq!(ranked[1], (2, dec("0"), 2));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn recompute_writes_scores_and_stamps_collection(pool: sqlx::PgPool) {
        let (user_id, collection_id) = testutil::seed_user_and_collection(&pool).await;
        let rare = testutil::seed_unpinned_nft_with_attributes(
            &pool,
            collection_id,
            user_id,
            0,
            serde_json::json!({"background": "gold"}),
        )
        .await;
        let common_a = testutil::seed_unpinned_nft_with_attributes(
            &pool,
            collection_id,
            user_id,
            1,
            serde_json::json!({"background": "blue"}),
        )
        .await;
        testutil::seed_unpinned_nft_with_attributes(
            &pool,
            collection_id,
            user_id,
            2,
            serde_json::json!({"background": "blue"}),
        )
        .await;

        let report = run_tick(&pool, &definition(10)).await;
        assert_eq!(report.selected, 1);
        assert_eq!(report.committed, 1);

        let rare_row = primemkt_db::get_nft(&pool, rare)
            .await
            .expect("get")
            .expect("row exists");
        assert_eq!(rare_row.rarity_rank, Some(1));
        assert_eq!(rare_row.rarity_score, Some(dec("3.000000")));

        let common_row = primemkt_db::get_nft(&pool, common_a)
            .await
            .expect("get")
            .expect("row exists");
        assert_eq!(common_row.rarity_rank, Some(2));

        let refreshed_at: Option<chrono::DateTime<chrono::Utc>> =
            sqlx::query_scalar("SELECT rarity_refreshed_at FROM collections WHERE id = $1")
                .bind(collection_id)
                .fetch_one(&pool)
                .await
                .expect("fetch refresh stamp");
        assert!(
            refreshed_at.is_some(),
            "successful recompute must stamp the collection"
        );
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn freshly_scored_collections_are_not_reselected(pool: sqlx::PgPool) {
        let (user_id, collection_id) = testutil::seed_user_and_collection(&pool).await;
        testutil::seed_unpinned_nft(&pool, collection_id, user_id, 0).await;

        let def = definition(10);
        let first = run_tick(&pool, &def).await;
        assert_eq!(first.committed, 1);

        let second = run_tick(&pool, &def).await;
        assert_eq!(second.selected, 0, "stamped collection must drop out of selection");
    }
}
