//! Media pinning task.
//!
//! Selects NFTs whose `media_cid` is still `NULL`, asks the pinning gateway
//! to pin the referenced media, and writes the resulting CID and path back.
//! Runs every 2 minutes by default (`PRIMEMKT_PIN_MEDIA_CRON` overrides).

use std::sync::Arc;

use sqlx::PgPool;

use primemkt_pinner::PinClient;

use crate::outcome::ItemOutcome;
use crate::registry::{RetryPolicy, TaskDefinition};
use crate::runner::Processor;
use crate::select::{Selection, SelectionFilter, WorkItem};

const TASK_NAME: &str = "pin_media";
const DEFAULT_CADENCE: &str = "0 */2 * * * *";

/// An item whose media URL reliably fails to pin (deleted upstream, bad
/// URL) is dead-lettered after this many ticks instead of wasting a
/// selection slot forever.
const MAX_ATTEMPTS: i32 = 5;

pub(super) fn definition(pinner: Arc<PinClient>, batch_size: i64) -> TaskDefinition {
    let cadence = std::env::var("PRIMEMKT_PIN_MEDIA_CRON")
        .unwrap_or_else(|_| DEFAULT_CADENCE.to_string());

    TaskDefinition {
        name: TASK_NAME,
        cadence,
        selection: Selection {
            table: "nfts",
            filter: SelectionFilter::IsNull { column: "media_cid" },
            batch_size,
        },
        retry: RetryPolicy::MaxAttempts(MAX_ATTEMPTS),
        processor: Arc::new(PinMediaProcessor { pinner }),
    }
}

struct PinMediaProcessor {
    pinner: Arc<PinClient>,
}

#[async_trait::async_trait]
impl Processor for PinMediaProcessor {
    async fn process(&self, pool: &PgPool, item: &WorkItem) -> ItemOutcome {
        let nft = match primemkt_db::get_nft(pool, item.id).await {
            Ok(Some(nft)) => nft,
            Ok(None) => {
                return ItemOutcome::Skipped {
                    reason: "nft deleted since selection".to_string(),
                }
            }
            Err(e) => {
                return ItemOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        if nft.media_cid.is_some() {
            return ItemOutcome::Skipped {
                reason: "already pinned".to_string(),
            };
        }

        let receipt = match self.pinner.pin_url(&nft.media_url).await {
            Ok(receipt) => receipt,
            Err(e) => {
                return ItemOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        match primemkt_db::set_nft_pin(pool, nft.id, &receipt.content_id, &receipt.path).await {
            Ok(_) => {
                tracing::info!(
                    nft_id = nft.id,
                    cid = %receipt.content_id,
                    "scheduler: pinned media"
                );
                ItemOutcome::Committed
            }
            Err(e) => ItemOutcome::Failed {
                error: e.to_string(),
            },
        }
    }
}
