//! Database operations for `users`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `users` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub public_id: Uuid,
    pub wallet_address: String,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a new user account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub wallet_address: String,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
}

const USER_COLUMNS: &str = "id, public_id, wallet_address, username, display_name, \
                            avatar_url, bio, is_admin, created_at, updated_at";

/// Creates a new user account.
///
/// Generates a UUID in Rust and binds it to `public_id`. Returns the full
/// newly-created row. Wallet address and username uniqueness are enforced
/// by the store; duplicates surface as a unique-constraint violation.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_user(pool: &PgPool, user: &NewUser) -> Result<UserRow, DbError> {
    let public_id = Uuid::new_v4();

    let row = sqlx::query_as::<_, UserRow>(&format!(
        "INSERT INTO users (public_id, wallet_address, username, display_name, avatar_url, bio) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(public_id)
    .bind(&user.wallet_address)
    .bind(&user.username)
    .bind(&user.display_name)
    .bind(&user.avatar_url)
    .bind(&user.bio)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Fetches a user by username, if one exists.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_user_by_username(pool: &PgPool, username: &str) -> Result<Option<UserRow>, DbError> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
    ))
    .bind(username)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
