/// Notification model and database operations
///
/// Notifications are short messages addressed to one user. Super admins send
/// them, recipients read and reply to them.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE notifications (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     user_id INTEGER NOT NULL REFERENCES users(id),
///     title TEXT NOT NULL,
///     message TEXT NOT NULL,
///     created_at TEXT NOT NULL,
///     is_read INTEGER NOT NULL DEFAULT 0
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// Notification model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: i64,

    /// Recipient
    pub user_id: i64,

    pub title: String,

    pub message: String,

    pub created_at: DateTime<Utc>,

    /// Stored for the mailbox badge; nothing clears it yet
    pub is_read: bool,
}

/// Input for creating a notification
#[derive(Debug, Clone)]
pub struct CreateNotification {
    pub user_id: i64,
    pub title: String,
    pub message: String,
}

impl Notification {
    /// Creates an unread notification
    pub async fn create(pool: &SqlitePool, data: CreateNotification) -> Result<Self, sqlx::Error> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (user_id, title, message, created_at, is_read)
            VALUES (?, ?, ?, ?, 0)
            RETURNING id, user_id, title, message, created_at, is_read
            "#,
        )
        .bind(data.user_id)
        .bind(data.title)
        .bind(data.message)
        .bind(Utc::now())
        .fetch_all(pool)
        .await?
        .pop()
        .ok_or(sqlx::Error::RowNotFound)?;

        Ok(notification)
    }

    /// Lists a user's notifications, newest first
    pub async fn list_for_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, title, message, created_at, is_read
            FROM notifications
            WHERE user_id = ?
            ORDER BY id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(notifications)
    }

    /// Number of unread notifications for a user
    pub async fn count_unread(pool: &SqlitePool, user_id: i64) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0")
                .bind(user_id)
                .fetch_one(pool)
                .await?;

        Ok(count)
    }
}
