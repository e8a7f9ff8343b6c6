//! In-app notifications

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::PostStatus;

/// A notification addressed to a single user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub post_id: Option<Uuid>,
    pub title: String,
    pub message: String,
    pub message_ja: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

/// Rendered notification text in both languages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationText {
    pub title: String,
    pub message: String,
    pub message_ja: String,
}

/// Text sent to a reporter when staff change the status of their report
pub fn status_change_text(post_title: &str, from: PostStatus, to: PostStatus) -> NotificationText {
    let title = if post_title.is_empty() {
        "タイトルなし"
    } else {
        post_title
    };
    NotificationText {
        title: format!("Report status updated: {}", title),
        message: format!(
            "The status of your report \"{}\" changed from {} to {}.",
            title, from, to
        ),
        message_ja: format!(
            "ご報告「{}」の対応状況が「{}」から「{}」に変更されました。",
            title,
            from.label_ja(),
            to.label_ja()
        ),
    }
}
