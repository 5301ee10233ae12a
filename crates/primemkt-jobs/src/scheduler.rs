//! Tick scheduling on top of [`tokio_cron_scheduler`].
//!
//! Each registered task gets one independent cron timer; there is no
//! ordering, priority, or shared lock across tasks. A per-task in-flight
//! flag skips ticks that fire while the previous run of the same task is
//! still active, so overlapping runs of one task never race on the same
//! work items.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::error::JobError;
use crate::registry::{SchedulerRegistry, TaskDefinition};
use crate::runner::run_tick;

/// Handle to the running scheduler. Keep it alive for the lifetime of the
/// process and call [`Scheduler::shutdown`] on termination.
pub struct Scheduler {
    inner: JobScheduler,
}

impl Scheduler {
    /// Stops all task timers. In-flight ticks run to completion; no new
    /// ticks fire afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Scheduler`] if the underlying scheduler fails to
    /// shut down.
    pub async fn shutdown(&mut self) -> Result<(), JobError> {
        self.inner.shutdown().await?;
        tracing::info!("scheduler: stopped all task timers");
        Ok(())
    }
}

/// Builds and starts the scheduler from a fully-assembled registry.
///
/// Consumes the registry: the task set is immutable once the timers are
/// running.
///
/// # Errors
///
/// Returns [`JobError::Scheduler`] if the scheduler cannot be initialised,
/// a job cannot be added, or the scheduler fails to start.
pub async fn build_scheduler(
    registry: SchedulerRegistry,
    pool: PgPool,
) -> Result<Scheduler, JobError> {
    let scheduler = JobScheduler::new().await?;

    for definition in registry.into_definitions() {
        register_job(&scheduler, Arc::new(definition), pool.clone()).await?;
    }

    scheduler.start().await?;
    Ok(Scheduler { inner: scheduler })
}

async fn register_job(
    scheduler: &JobScheduler,
    def: Arc<TaskDefinition>,
    pool: PgPool,
) -> Result<(), JobError> {
    let in_flight = Arc::new(AtomicBool::new(false));
    let cadence = def.cadence.clone();

    let job_def = Arc::clone(&def);
    let job = Job::new_async(cadence.as_str(), move |_uuid, _lock| {
        let def = Arc::clone(&job_def);
        let pool = pool.clone();
        let in_flight = Arc::clone(&in_flight);

        Box::pin(async move {
            // Re-entrancy guard: a tick that fires while the previous run of
            // this task is still active is skipped, not queued.
            if in_flight.swap(true, Ordering::SeqCst) {
                tracing::warn!(
                    task = def.name,
                    "scheduler: previous run still active; skipping tick"
                );
                return;
            }

            run_tick(&pool, &def).await;

            in_flight.store(false, Ordering::SeqCst);
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(task = def.name, cadence = %def.cadence, "scheduler: registered task");
    Ok(())
}
