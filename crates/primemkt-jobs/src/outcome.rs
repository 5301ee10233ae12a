//! Per-item outcomes and the per-tick batch report.

use chrono::{DateTime, Utc};

/// What happened to one selected work item during a tick.
///
/// One item's failure never aborts the rest of the batch; every selected
/// item produces exactly one outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// The item's result was written back to the store.
    Committed,
    /// Nothing to write for this item this tick (e.g. the provider had no
    /// quote, or the item was processed by another path since selection).
    Skipped { reason: String },
    /// The external call or write-back failed; the item's status field is
    /// untouched, so it stays eligible for the next tick.
    Failed { error: String },
}

/// Summary of one task run. Ephemeral — logged at the end of the tick,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub task: &'static str,
    pub started_at: DateTime<Utc>,
    pub selected: usize,
    pub committed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub dead_lettered: usize,
}

impl RunReport {
    #[must_use]
    pub fn new(task: &'static str, started_at: DateTime<Utc>) -> Self {
        Self {
            task,
            started_at,
            selected: 0,
            committed: 0,
            skipped: 0,
            failed: 0,
            dead_lettered: 0,
        }
    }

    /// Tallies one item outcome into the report.
    pub(crate) fn record(&mut self, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Committed => self.committed += 1,
            ItemOutcome::Skipped { .. } => self.skipped += 1,
            ItemOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_tallies_each_variant() {
        let mut report = RunReport::new("pin_media", Utc::now());
        report.record(&ItemOutcome::Committed);
        report.record(&ItemOutcome::Committed);
        report.record(&ItemOutcome::Skipped {
            reason: "already pinned".to_string(),
        });
        report.record(&ItemOutcome::Failed {
            error: "gateway unreachable".to_string(),
        });

        assert_eq!(report.committed, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.dead_lettered, 0);
    }
}
