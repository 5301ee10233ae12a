//! The per-tick driver: select a batch, process each item in order, commit
//! results, and log a batch report.

use chrono::Utc;
use sqlx::PgPool;

use crate::outcome::{ItemOutcome, RunReport};
use crate::registry::TaskDefinition;
use crate::select::{select_batch, WorkItem};

/// A task's item processor: one external side-effecting operation plus the
/// write-back, for one work item.
///
/// Implementations catch their own client and store errors and map them to
/// an [`ItemOutcome`]; they never panic the tick.
#[async_trait::async_trait]
pub trait Processor: Send + Sync {
    async fn process(&self, pool: &PgPool, item: &WorkItem) -> ItemOutcome;
}

/// Runs one tick of a task: one selection, then strictly sequential
/// processing of the batch.
///
/// Each item fully completes — including its write-back and failure
/// bookkeeping — before the next begins; there is no fan-out within a
/// batch. A selection failure ends the tick with an empty report; the next
/// cadence tick is the retry.
pub async fn run_tick(pool: &PgPool, def: &TaskDefinition) -> RunReport {
    let mut report = RunReport::new(def.name, Utc::now());

    let items = match select_batch(pool, def.name, &def.selection).await {
        Ok(items) => items,
        Err(e) => {
            tracing::error!(task = def.name, error = %e, "scheduler: work selection failed");
            return report;
        }
    };

    report.selected = items.len();
    if items.is_empty() {
        tracing::debug!(task = def.name, "scheduler: nothing to process");
        return report;
    }

    for item in &items {
        let outcome = def.processor.process(pool, item).await;
        settle_item(pool, def, item, &outcome, &mut report).await;
        report.record(&outcome);
    }

    tracing::info!(
        task = def.name,
        selected = report.selected,
        committed = report.committed,
        skipped = report.skipped,
        failed = report.failed,
        dead_lettered = report.dead_lettered,
        "scheduler: run complete"
    );

    report
}

/// Applies failure bookkeeping for one item's outcome.
async fn settle_item(
    pool: &PgPool,
    def: &TaskDefinition,
    item: &WorkItem,
    outcome: &ItemOutcome,
    report: &mut RunReport,
) {
    match outcome {
        ItemOutcome::Committed | ItemOutcome::Skipped { .. } => {
            if let Err(e) = primemkt_db::clear_attempts(pool, def.name, item.id).await {
                tracing::warn!(
                    task = def.name,
                    item_id = item.id,
                    error = %e,
                    "scheduler: failed to clear attempt bookkeeping"
                );
            }
        }
        ItemOutcome::Failed { error } => {
            match primemkt_db::record_failure(pool, def.name, item.id, error, def.retry.max_attempts())
                .await
            {
                Ok(true) => {
                    report.dead_lettered += 1;
                    tracing::error!(
                        task = def.name,
                        item_id = item.id,
                        error = %error,
                        "scheduler: item dead-lettered after exhausting its retry budget"
                    );
                }
                Ok(false) => {
                    tracing::warn!(
                        task = def.name,
                        item_id = item.id,
                        error = %error,
                        "scheduler: item failed; eligible again next tick"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        task = def.name,
                        item_id = item.id,
                        error = %e,
                        "scheduler: failed to record item failure"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RetryPolicy;
    use crate::select::{Selection, SelectionFilter};
    use crate::testutil;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Writes a pin for every item except the nth call, which fails.
    struct FailNthProcessor {
        calls: AtomicUsize,
        fail_on_call: usize,
    }

    #[async_trait::async_trait]
    impl Processor for FailNthProcessor {
        async fn process(&self, pool: &PgPool, item: &WorkItem) -> ItemOutcome {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.fail_on_call {
                return ItemOutcome::Failed {
                    error: "simulated gateway failure".to_string(),
                };
            }
            match primemkt_db::set_nft_pin(pool, item.id, "bafytest", "/ipfs/bafytest").await {
                Ok(_) => ItemOutcome::Committed,
                Err(e) => ItemOutcome::Failed {
                    error: e.to_string(),
                },
            }
        }
    }

    fn unpinned_definition(processor: Arc<dyn Processor>, retry: RetryPolicy) -> TaskDefinition {
        TaskDefinition {
            name: "pin_media",
            cadence: "0 */2 * * * *".to_string(),
            selection: Selection {
                table: "nfts",
                filter: SelectionFilter::IsNull { column: "media_cid" },
                batch_size: 10,
            },
            retry,
            processor,
        }
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn one_failure_does_not_abandon_the_batch(pool: PgPool) {
        let (user_id, collection_id) = testutil::seed_user_and_collection(&pool).await;
        let mut ids = Vec::new();
        for i in 0..5 {
            ids.push(testutil::seed_unpinned_nft(&pool, collection_id, user_id, i).await);
        }

        // Selection is newest-first, so the second call lands on ids[3].
        let def = unpinned_definition(
            Arc::new(FailNthProcessor {
                calls: AtomicUsize::new(0),
                fail_on_call: 2,
            }),
            RetryPolicy::Unbounded,
        );
        let report = run_tick(&pool, &def).await;

        assert_eq!(report.selected, 5);
        assert_eq!(report.committed, 4);
        assert_eq!(report.failed, 1);
        assert_eq!(report.dead_lettered, 0);

        let failed_id = ids[3];
        for id in ids {
            let nft = primemkt_db::get_nft(&pool, id)
                .await
                .expect("get nft")
                .expect("nft exists");
            if id == failed_id {
                assert!(nft.media_cid.is_none(), "failed item must stay unprocessed");
            } else {
                assert_eq!(nft.media_cid.as_deref(), Some("bafytest"));
            }
        }

        let attempt = primemkt_db::get_attempt(&pool, "pin_media", failed_id)
            .await
            .expect("get attempt")
            .expect("failure recorded");
        assert_eq!(attempt.attempts, 1);
        assert!(!attempt.dead_lettered);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn failed_item_dead_letters_under_bounded_policy(pool: PgPool) {
        let (user_id, collection_id) = testutil::seed_user_and_collection(&pool).await;
        testutil::seed_unpinned_nft(&pool, collection_id, user_id, 0).await;

        let def = unpinned_definition(
            Arc::new(FailNthProcessor {
                calls: AtomicUsize::new(0),
                // Every call fails: fail_on_call matches the only item each tick.
                fail_on_call: 1,
            }),
            RetryPolicy::MaxAttempts(1),
        );
        let report = run_tick(&pool, &def).await;
        assert_eq!(report.failed, 1);
        assert_eq!(report.dead_lettered, 1);

        // The dead-lettered item no longer occupies a selection slot.
        let next = run_tick(&pool, &def).await;
        assert_eq!(next.selected, 0);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn success_clears_prior_failure_bookkeeping(pool: PgPool) {
        let (user_id, collection_id) = testutil::seed_user_and_collection(&pool).await;
        let nft = testutil::seed_unpinned_nft(&pool, collection_id, user_id, 0).await;

        primemkt_db::record_failure(&pool, "pin_media", nft, "transient", Some(5))
            .await
            .expect("record failure");

        let def = unpinned_definition(
            Arc::new(FailNthProcessor {
                calls: AtomicUsize::new(0),
                fail_on_call: usize::MAX,
            }),
            RetryPolicy::MaxAttempts(5),
        );
        let report = run_tick(&pool, &def).await;
        assert_eq!(report.committed, 1);

        let attempt = primemkt_db::get_attempt(&pool, "pin_media", nft)
            .await
            .expect("get attempt");
        assert!(attempt.is_none(), "success must clear the attempt row");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn empty_selection_produces_empty_report(pool: PgPool) {
        let def = unpinned_definition(
            Arc::new(FailNthProcessor {
                calls: AtomicUsize::new(0),
                fail_on_call: usize::MAX,
            }),
            RetryPolicy::Unbounded,
        );
        let report = run_tick(&pool, &def).await;
        assert_eq!(report.selected, 0);
        assert_eq!(report.committed, 0);
    }
}
