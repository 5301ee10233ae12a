use thiserror::Error;

/// Errors produced by the job subsystem.
///
/// Registration errors (`InvalidCadence`, `DuplicateTask`) are fatal at
/// startup. Runtime item failures are not represented here — they are
/// captured per item as [`crate::ItemOutcome::Failed`] and never abort a
/// tick.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("task '{task}' has invalid cadence '{cadence}': {reason}")]
    InvalidCadence {
        task: String,
        cadence: String,
        reason: String,
    },

    #[error("task '{0}' is already registered")]
    DuplicateTask(String),

    #[error(transparent)]
    Db(#[from] primemkt_db::DbError),

    #[error(transparent)]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),
}
