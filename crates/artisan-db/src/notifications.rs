//! Database operations for `notifications` and broadcast read receipts.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A notification as seen by one client. `read_at` merges the row's own
/// read timestamp with the client's receipt for broadcasts.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct NotificationRow {
    pub id: Uuid,
    /// `None` for broadcasts.
    pub client_id: Option<Uuid>,
    pub title: String,
    pub body: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (unknown client is a
/// foreign-key violation).
pub async fn create_notification(
    pool: &PgPool,
    client_id: Option<Uuid>,
    title: &str,
    body: &str,
) -> Result<NotificationRow, DbError> {
    let row = sqlx::query_as::<_, NotificationRow>(
        "INSERT INTO notifications (client_id, title, body) \
         VALUES ($1, $2, $3) \
         RETURNING id, client_id, title, body, read_at, created_at",
    )
    .bind(client_id)
    .bind(title)
    .bind(body)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// A client's own notifications plus broadcasts, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_notifications_for_client(
    pool: &PgPool,
    client_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<NotificationRow>, DbError> {
    let rows = sqlx::query_as::<_, NotificationRow>(
        "SELECT n.id, n.client_id, n.title, n.body, \
                COALESCE(n.read_at, r.read_at) AS read_at, n.created_at \
         FROM notifications n \
         LEFT JOIN notification_reads r \
                ON r.notification_id = n.id AND r.client_id = $1 \
         WHERE n.client_id = $1 OR n.client_id IS NULL \
         ORDER BY n.created_at DESC, n.id \
         LIMIT $2 OFFSET $3",
    )
    .bind(client_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Marks a notification read for `client_id`. Idempotent: the first read
/// timestamp is kept.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the notification does not exist or is
/// addressed to another client.
pub async fn mark_notification_read(
    pool: &PgPool,
    id: Uuid,
    client_id: Uuid,
) -> Result<NotificationRow, DbError> {
    let mut tx = pool.begin().await?;

    let target: Option<Uuid> = sqlx::query_scalar::<_, Option<Uuid>>(
        "SELECT client_id FROM notifications \
         WHERE id = $1 AND (client_id = $2 OR client_id IS NULL)",
    )
    .bind(id)
    .bind(client_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(DbError::NotFound)?;

    if target.is_some() {
        sqlx::query("UPDATE notifications SET read_at = COALESCE(read_at, NOW()) WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
    } else {
        sqlx::query(
            "INSERT INTO notification_reads (notification_id, client_id) \
             VALUES ($1, $2) \
             ON CONFLICT (notification_id, client_id) DO NOTHING",
        )
        .bind(id)
        .bind(client_id)
        .execute(&mut *tx)
        .await?;
    }

    let row = sqlx::query_as::<_, NotificationRow>(
        "SELECT n.id, n.client_id, n.title, n.body, \
                COALESCE(n.read_at, r.read_at) AS read_at, n.created_at \
         FROM notifications n \
         LEFT JOIN notification_reads r \
                ON r.notification_id = n.id AND r.client_id = $2 \
         WHERE n.id = $1",
    )
    .bind(id)
    .bind(client_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(row)
}
