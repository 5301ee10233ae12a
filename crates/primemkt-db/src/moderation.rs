//! Database operations for `moderation_logs`.
//!
//! The moderation log is append-only: admin actions are inserted and
//! listed, never updated or deleted.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `moderation_logs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ModerationLogRow {
    pub id: i64,
    pub actor_id: i64,
    pub action: String,
    pub target_kind: String,
    pub target_id: i64,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Appends an admin action to the moderation log.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_moderation_log(
    pool: &PgPool,
    actor_id: i64,
    action: &str,
    target_kind: &str,
    target_id: i64,
    reason: Option<&str>,
) -> Result<ModerationLogRow, DbError> {
    let row = sqlx::query_as::<_, ModerationLogRow>(
        "INSERT INTO moderation_logs (actor_id, action, target_kind, target_id, reason) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id, actor_id, action, target_kind, target_id, reason, created_at",
    )
    .bind(actor_id)
    .bind(action)
    .bind(target_kind)
    .bind(target_id)
    .bind(reason)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Lists moderation log entries, newest first, up to `limit`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_moderation_logs(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<ModerationLogRow>, DbError> {
    let rows = sqlx::query_as::<_, ModerationLogRow>(
        "SELECT id, actor_id, action, target_kind, target_id, reason, created_at \
         FROM moderation_logs \
         ORDER BY created_at DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
