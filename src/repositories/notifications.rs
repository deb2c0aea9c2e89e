use sqlx::types::Json;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Notification;

const COLUMNS: &str = "id, user_id, kind, title, message, payload, is_read, created_at, read_at";

pub(crate) struct CreateNotification<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) kind: &'a str,
    pub(crate) title: &'a str,
    pub(crate) message: &'a str,
    pub(crate) payload: serde_json::Value,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateNotification<'_>,
) -> Result<Notification, sqlx::Error> {
    sqlx::query_as::<_, Notification>(&format!(
        "INSERT INTO notifications (id, user_id, kind, title, message, payload, is_read, created_at)
         VALUES ($1,$2,$3,$4,$5,$6,FALSE,$7)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.kind)
    .bind(params.title)
    .bind(params.message)
    .bind(Json(params.payload))
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list_by_user(
    pool: &PgPool,
    user_id: &str,
    unread_only: bool,
    skip: i64,
    limit: i64,
) -> Result<Vec<Notification>, sqlx::Error> {
    sqlx::query_as::<_, Notification>(&format!(
        "SELECT {COLUMNS}
         FROM notifications
         WHERE user_id = $1 AND ($2 = FALSE OR is_read = FALSE)
         ORDER BY created_at DESC, id
         OFFSET $3 LIMIT $4"
    ))
    .bind(user_id)
    .bind(unread_only)
    .bind(skip.max(0))
    .bind(limit.clamp(1, 1000))
    .fetch_all(pool)
    .await
}

/// Returns `(total, unread)` for the listing filter.
pub(crate) async fn counts_by_user(
    pool: &PgPool,
    user_id: &str,
    unread_only: bool,
) -> Result<(i64, i64), sqlx::Error> {
    sqlx::query_as::<_, (i64, i64)>(
        "SELECT COUNT(*) FILTER (WHERE $2 = FALSE OR is_read = FALSE),
                COUNT(*) FILTER (WHERE is_read = FALSE)
         FROM notifications
         WHERE user_id = $1",
    )
    .bind(user_id)
    .bind(unread_only)
    .fetch_one(pool)
    .await
}

/// Marks one of the user's notifications read; other users' ids are treated
/// as missing.
pub(crate) async fn mark_read(
    pool: &PgPool,
    id: &str,
    user_id: &str,
    now: PrimitiveDateTime,
) -> Result<Option<Notification>, sqlx::Error> {
    sqlx::query_as::<_, Notification>(&format!(
        "UPDATE notifications
         SET is_read = TRUE, read_at = COALESCE(read_at, $1)
         WHERE id = $2 AND user_id = $3
         RETURNING {COLUMNS}"
    ))
    .bind(now)
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn mark_all_read(
    pool: &PgPool,
    user_id: &str,
    now: PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE notifications SET is_read = TRUE, read_at = $1 WHERE user_id = $2 AND is_read = FALSE",
    )
    .bind(now)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
