//! In-app notifications for residents
//!
//! Status changes made by staff are recorded here. The same text is written
//! to the log where an email relay can pick it up.

use chrono::{DateTime, Utc};
use shared::{status_change_text, Notification, PostStatus};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, post_id, title, message, message_ja, is_read, created_at, read_at";

#[derive(Debug, FromRow)]
struct NotificationRow {
    id: Uuid,
    user_id: Uuid,
    post_id: Option<Uuid>,
    title: String,
    message: String,
    message_ja: String,
    is_read: bool,
    created_at: DateTime<Utc>,
    read_at: Option<DateTime<Utc>>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Notification {
            id: row.id,
            user_id: row.user_id,
            post_id: row.post_id,
            title: row.title,
            message: row.message,
            message_ja: row.message_ja,
            is_read: row.is_read,
            created_at: row.created_at,
            read_at: row.read_at,
        }
    }
}

#[derive(Clone)]
pub struct NotificationService {
    db: PgPool,
}

impl NotificationService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Tell a reporter that staff changed the status of their report
    pub async fn notify_status_change(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        post_title: &str,
        from: PostStatus,
        to: PostStatus,
    ) -> AppResult<Notification> {
        let text = status_change_text(post_title, from, to);

        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            INSERT INTO notifications (user_id, post_id, title, message, message_ja)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
        ))
        .bind(user_id)
        .bind(post_id)
        .bind(&text.title)
        .bind(&text.message)
        .bind(&text.message_ja)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(
            %user_id,
            %post_id,
            subject = %text.title,
            body = %text.message_ja,
            "status change notification queued"
        );

        Ok(row.into())
    }

    /// Notifications of a user, newest first
    pub async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {} FROM notifications WHERE user_id = $1 ORDER BY created_at DESC",
            NOTIFICATION_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Notification::from).collect())
    }

    /// Mark one of the user's notifications as read
    pub async fn mark_read(&self, user_id: Uuid, notification_id: Uuid) -> AppResult<Notification> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            UPDATE notifications
            SET is_read = true, read_at = COALESCE(read_at, NOW())
            WHERE id = $1 AND user_id = $2
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
        ))
        .bind(notification_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Notification"))?;

        Ok(row.into())
    }
}
