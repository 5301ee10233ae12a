//! Task definitions and the startup registry.

use std::str::FromStr;
use std::sync::Arc;

use crate::error::JobError;
use crate::runner::Processor;
use crate::select::Selection;

/// How a task treats an item that keeps failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Retry on every tick until the item succeeds. The cadence period is
    /// the only backoff.
    Unbounded,
    /// Dead-letter the item after this many consecutive failures, removing
    /// it from selection so it stops consuming a batch slot.
    MaxAttempts(i32),
}

impl RetryPolicy {
    /// The bound to pass to failure bookkeeping; `None` means unbounded.
    #[must_use]
    pub fn max_attempts(self) -> Option<i32> {
        match self {
            RetryPolicy::Unbounded => None,
            RetryPolicy::MaxAttempts(n) => Some(n),
        }
    }
}

/// One named periodic task: cadence, selection, retry policy, and the
/// processor invoked per selected item. Immutable once registered.
#[derive(Clone)]
pub struct TaskDefinition {
    pub name: &'static str,
    /// Six-field cron expression (with seconds), evaluated in UTC.
    pub cadence: String,
    pub selection: Selection,
    pub retry: RetryPolicy,
    pub processor: Arc<dyn Processor>,
}

impl std::fmt::Debug for TaskDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskDefinition")
            .field("name", &self.name)
            .field("cadence", &self.cadence)
            .field("selection", &self.selection)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

/// The set of task definitions assembled by the process entry point and
/// handed to [`crate::build_scheduler`].
///
/// Registration is the configuration boundary: an invalid cadence or a
/// duplicate name is a startup error, never a runtime surprise.
#[derive(Debug, Default)]
pub struct SchedulerRegistry {
    definitions: Vec<TaskDefinition>,
}

impl SchedulerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a task definition.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::DuplicateTask`] if a task with the same name is
    /// already registered, or [`JobError::InvalidCadence`] if the cadence
    /// does not parse as a cron expression.
    pub fn register(&mut self, definition: TaskDefinition) -> Result<(), JobError> {
        if self.definitions.iter().any(|d| d.name == definition.name) {
            return Err(JobError::DuplicateTask(definition.name.to_string()));
        }

        cron::Schedule::from_str(&definition.cadence).map_err(|e| JobError::InvalidCadence {
            task: definition.name.to_string(),
            cadence: definition.cadence.clone(),
            reason: e.to_string(),
        })?;

        self.definitions.push(definition);
        Ok(())
    }

    /// The registered definitions, in registration order.
    #[must_use]
    pub fn definitions(&self) -> &[TaskDefinition] {
        &self.definitions
    }

    pub(crate) fn into_definitions(self) -> Vec<TaskDefinition> {
        self.definitions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::ItemOutcome;
    use crate::select::{SelectionFilter, WorkItem};
    use sqlx::PgPool;

    struct NoopProcessor;

    #[async_trait::async_trait]
    impl Processor for NoopProcessor {
        async fn process(&self, _pool: &PgPool, _item: &WorkItem) -> ItemOutcome {
            ItemOutcome::Committed
        }
    }

    fn definition(name: &'static str, cadence: &str) -> TaskDefinition {
        TaskDefinition {
            name,
            cadence: cadence.to_string(),
            selection: Selection {
                table: "nfts",
                filter: SelectionFilter::IsNull { column: "media_cid" },
                batch_size: 10,
            },
            retry: RetryPolicy::Unbounded,
            processor: Arc::new(NoopProcessor),
        }
    }

    #[test]
    fn register_accepts_valid_definition() {
        let mut registry = SchedulerRegistry::new();
        registry
            .register(definition("pin_media", "0 */2 * * * *"))
            .expect("valid definition registers");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn register_rejects_duplicate_name() {
        let mut registry = SchedulerRegistry::new();
        registry
            .register(definition("pin_media", "0 */2 * * * *"))
            .expect("first registration");
        let result = registry.register(definition("pin_media", "0 */5 * * * *"));
        assert!(
            matches!(result, Err(JobError::DuplicateTask(ref name)) if name == "pin_media"),
            "duplicate names must fail registration, got: {result:?}"
        );
    }

    #[test]
    fn register_rejects_invalid_cadence() {
        let mut registry = SchedulerRegistry::new();
        let result = registry.register(definition("pin_media", "every two minutes"));
        assert!(
            matches!(result, Err(JobError::InvalidCadence { ref task, .. }) if task == "pin_media"),
            "invalid cron must fail registration, got: {result:?}"
        );
    }

    #[test]
    fn retry_policy_max_attempts_bound() {
        assert_eq!(RetryPolicy::Unbounded.max_attempts(), None);
        assert_eq!(RetryPolicy::MaxAttempts(5).max_attempts(), Some(5));
    }
}
