//! Work selection: one bounded newest-first query per tick.
//!
//! Filters are a closed set of tagged variants rather than arbitrary
//! predicates, so selection stays a single renderable SQL query. Table and
//! column identifiers are compile-time constants owned by the task
//! constructors; only values are bound.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::JobError;

/// The supported "not yet processed" filter kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionFilter {
    /// A derived column the task populates is still `NULL`.
    IsNull { column: &'static str },
    /// A boolean flag column equals the given value.
    Equals { column: &'static str, value: bool },
    /// A timestamp column is `NULL` or older than `max_age_secs`.
    StaleAfter {
        column: &'static str,
        max_age_secs: i64,
    },
}

/// One task's selection: which table, which filter, how many per tick.
///
/// Every tick issues a fresh query — no cursor is kept across ticks, and
/// ordering is always newest-first by `created_at`. Dead-lettered items are
/// excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub table: &'static str,
    pub filter: SelectionFilter,
    pub batch_size: i64,
}

/// A selected work item: the record's id plus the creation time the
/// ordering is derived from. Processors load whatever else they need by id.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct WorkItem {
    pub id: i64,
    pub created_at: DateTime<Utc>,
}

impl Selection {
    fn render_sql(&self) -> String {
        let filter = match &self.filter {
            SelectionFilter::IsNull { column } => format!("t.{column} IS NULL"),
            SelectionFilter::Equals { column, .. } => format!("t.{column} = $2"),
            SelectionFilter::StaleAfter { column, .. } => format!(
                "(t.{column} IS NULL OR t.{column} < NOW() - make_interval(secs => $2))"
            ),
        };

        format!(
            "SELECT t.id, t.created_at FROM {table} t \
             WHERE {filter} \
               AND NOT EXISTS ( \
                   SELECT 1 FROM job_attempts ja \
                   WHERE ja.task_name = $1 AND ja.item_id = t.id AND ja.dead_lettered \
               ) \
             ORDER BY t.created_at DESC \
             LIMIT {batch}",
            table = self.table,
            batch = self.batch_size,
        )
    }
}

/// Selects the next batch of work items for a task.
///
/// Returns at most `batch_size` items matching the filter, newest-first.
/// There is no aging policy: a steady arrival of newer matching items can
/// starve older ones indefinitely.
///
/// # Errors
///
/// Returns [`JobError::Db`] if the query fails.
pub async fn select_batch(
    pool: &PgPool,
    task_name: &str,
    selection: &Selection,
) -> Result<Vec<WorkItem>, JobError> {
    let sql = selection.render_sql();

    let query = sqlx::query_as::<_, WorkItem>(&sql).bind(task_name);
    #[allow(clippy::cast_precision_loss)]
    let query = match selection.filter {
        SelectionFilter::IsNull { .. } => query,
        SelectionFilter::Equals { value, .. } => query.bind(value),
        SelectionFilter::StaleAfter { max_age_secs, .. } => query.bind(max_age_secs as f64),
    };

    let items = query
        .fetch_all(pool)
        .await
        .map_err(primemkt_db::DbError::from)?;
    Ok(items)
}
