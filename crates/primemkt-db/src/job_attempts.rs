//! Failure bookkeeping for the scheduled-job subsystem.
//!
//! One row per `(task_name, item_id)` that is currently failing. The row is
//! deleted on the first successful processing of the item, so the table only
//! ever holds the failing tail. When a task runs with a bounded retry policy
//! and the attempt count reaches the maximum, the row is flagged
//! `dead_lettered` and work selection stops returning the item.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `job_attempts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JobAttemptRow {
    pub task_name: String,
    pub item_id: i64,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub last_attempt_at: DateTime<Utc>,
    pub dead_lettered: bool,
}

/// Records one failed processing attempt for `(task_name, item_id)`.
///
/// Increments the attempt counter atomically in a single upsert. When
/// `max_attempts` is `Some(n)` and the new counter reaches `n`, the row is
/// flagged dead-lettered. Returns `true` if the item is dead-lettered after
/// this attempt.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn record_failure(
    pool: &PgPool,
    task_name: &str,
    item_id: i64,
    error: &str,
    max_attempts: Option<i32>,
) -> Result<bool, DbError> {
    let dead_lettered: bool = sqlx::query_scalar::<_, bool>(
        "INSERT INTO job_attempts (task_name, item_id, attempts, last_error, last_attempt_at, dead_lettered) \
         VALUES ($1, $2, 1, $3, NOW(), $4::int IS NOT NULL AND 1 >= $4) \
         ON CONFLICT (task_name, item_id) DO UPDATE SET \
             attempts        = job_attempts.attempts + 1, \
             last_error      = EXCLUDED.last_error, \
             last_attempt_at = NOW(), \
             dead_lettered   = job_attempts.dead_lettered \
                               OR ($4::int IS NOT NULL AND job_attempts.attempts + 1 >= $4) \
         RETURNING dead_lettered",
    )
    .bind(task_name)
    .bind(item_id)
    .bind(error)
    .bind(max_attempts)
    .fetch_one(pool)
    .await?;

    Ok(dead_lettered)
}

/// Clears failure bookkeeping after a successful processing of the item.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn clear_attempts(pool: &PgPool, task_name: &str, item_id: i64) -> Result<(), DbError> {
    sqlx::query("DELETE FROM job_attempts WHERE task_name = $1 AND item_id = $2")
        .bind(task_name)
        .bind(item_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Fetches the attempt row for one `(task, item)`, if any.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_attempt(
    pool: &PgPool,
    task_name: &str,
    item_id: i64,
) -> Result<Option<JobAttemptRow>, DbError> {
    let row = sqlx::query_as::<_, JobAttemptRow>(
        "SELECT task_name, item_id, attempts, last_error, last_attempt_at, dead_lettered \
         FROM job_attempts \
         WHERE task_name = $1 AND item_id = $2",
    )
    .bind(task_name)
    .bind(item_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Counts dead-lettered items for one task.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_dead_lettered(pool: &PgPool, task_name: &str) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM job_attempts WHERE task_name = $1 AND dead_lettered",
    )
    .bind(task_name)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[sqlx::test(migrations = "../../migrations")]
    async fn record_failure_increments_attempts(pool: PgPool) {
        let dead = record_failure(&pool, "pin_media", 7, "connect timeout", Some(3))
            .await
            .expect("first failure");
        assert!(!dead);

        let dead = record_failure(&pool, "pin_media", 7, "connect timeout", Some(3))
            .await
            .expect("second failure");
        assert!(!dead);

        let row = get_attempt(&pool, "pin_media", 7)
            .await
            .expect("get")
            .expect("row exists");
        assert_eq!(row.attempts, 2);
        assert_eq!(row.last_error.as_deref(), Some("connect timeout"));
        assert!(!row.dead_lettered);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn record_failure_dead_letters_at_threshold(pool: PgPool) {
        for _ in 0..2 {
            record_failure(&pool, "pin_media", 7, "boom", Some(3))
                .await
                .expect("failure");
        }
        let dead = record_failure(&pool, "pin_media", 7, "boom", Some(3))
            .await
            .expect("third failure");
        assert!(dead, "third failure must dead-letter with max_attempts=3");

        assert_eq!(
            count_dead_lettered(&pool, "pin_media").await.expect("count"),
            1
        );
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn unbounded_policy_never_dead_letters(pool: PgPool) {
        for _ in 0..10 {
            let dead = record_failure(&pool, "exchange_rates", 1, "provider down", None)
                .await
                .expect("failure");
            assert!(!dead);
        }

        let row = get_attempt(&pool, "exchange_rates", 1)
            .await
            .expect("get")
            .expect("row exists");
        assert_eq!(row.attempts, 10);
        assert!(!row.dead_lettered);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn clear_attempts_removes_bookkeeping(pool: PgPool) {
        record_failure(&pool, "pin_media", 7, "boom", Some(3))
            .await
            .expect("failure");
        clear_attempts(&pool, "pin_media", 7).await.expect("clear");

        let row = get_attempt(&pool, "pin_media", 7).await.expect("get");
        assert!(row.is_none(), "success must clear the attempt row");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn attempts_are_scoped_per_task(pool: PgPool) {
        record_failure(&pool, "pin_media", 7, "boom", Some(1))
            .await
            .expect("failure");

        let other = get_attempt(&pool, "rarity", 7).await.expect("get");
        assert!(other.is_none(), "another task's bookkeeping must be separate");
    }
}
