//! Photo report models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UnknownChoice;

/// Maximum length of a report title
pub const TITLE_MAX_LEN: usize = 100;

/// Maximum length of a free-text location name
pub const LOCATION_NAME_MAX_LEN: usize = 255;

/// A resident-submitted issue report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoPost {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub title: String,
    pub comment: String,
    pub photo_path: String,
    pub photo_url: String,
    pub tag_id: Option<Uuid>,
    pub tag_name: Option<String>,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub location_name: Option<String>,
    pub status: PostStatus,
    pub priority: PostPriority,
    pub admin_note: Option<String>,
    pub posted_at: DateTime<Utc>,
}

impl std::fmt::Display for PhotoPost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let title = if self.title.is_empty() {
            "タイトルなし"
        } else {
            self.title.as_str()
        };
        write!(
            f,
            "{} by {} ({})",
            title,
            self.username,
            self.posted_at.format("%Y-%m-%d")
        )
    }
}

/// Handling status of a report
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    #[default]
    New,
    InProgress,
    Completed,
    NotRequired,
}

impl PostStatus {
    pub const ALL: [PostStatus; 4] = [
        PostStatus::New,
        PostStatus::InProgress,
        PostStatus::Completed,
        PostStatus::NotRequired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::New => "new",
            PostStatus::InProgress => "in_progress",
            PostStatus::Completed => "completed",
            PostStatus::NotRequired => "not_required",
        }
    }

    /// Japanese display label
    pub fn label_ja(&self) -> &'static str {
        match self {
            PostStatus::New => "新規",
            PostStatus::InProgress => "対応中",
            PostStatus::Completed => "対応完了",
            PostStatus::NotRequired => "対応不可",
        }
    }

    /// Whether reports in this status appear on public listings
    pub fn is_publicly_listed(&self) -> bool {
        !matches!(self, PostStatus::NotRequired)
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PostStatus::New => write!(f, "New"),
            PostStatus::InProgress => write!(f, "In Progress"),
            PostStatus::Completed => write!(f, "Completed"),
            PostStatus::NotRequired => write!(f, "Not Required"),
        }
    }
}

impl std::str::FromStr for PostStatus {
    type Err = UnknownChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PostStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownChoice {
                kind: "status",
                value: s.to_string(),
            })
    }
}

/// Staff-assigned handling priority
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum PostPriority {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl PostPriority {
    pub const ALL: [PostPriority; 4] = [
        PostPriority::None,
        PostPriority::Low,
        PostPriority::Medium,
        PostPriority::High,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PostPriority::None => "none",
            PostPriority::Low => "low",
            PostPriority::Medium => "medium",
            PostPriority::High => "high",
        }
    }

    /// Japanese display label
    pub fn label_ja(&self) -> &'static str {
        match self {
            PostPriority::None => "--",
            PostPriority::Low => "低",
            PostPriority::Medium => "中",
            PostPriority::High => "高",
        }
    }
}

impl std::fmt::Display for PostPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PostPriority::None => write!(f, "--"),
            PostPriority::Low => write!(f, "Low"),
            PostPriority::Medium => write!(f, "Medium"),
            PostPriority::High => write!(f, "High"),
        }
    }
}

impl std::str::FromStr for PostPriority {
    type Err = UnknownChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PostPriority::ALL
            .into_iter()
            .find(|priority| priority.as_str() == s)
            .ok_or_else(|| UnknownChoice {
                kind: "priority",
                value: s.to_string(),
            })
    }
}

/// Short human label for a report, used in deletion messages.
///
/// The first 20 characters of the comment followed by "..." when the comment
/// is longer, the whole comment otherwise, or `ID:<id>の報告` when empty.
pub fn post_summary(id: Uuid, comment: &str) -> String {
    const LIMIT: usize = 20;
    if comment.is_empty() {
        return format!("ID:{}の報告", id);
    }
    if comment.chars().count() > LIMIT {
        let head: String = comment.chars().take(LIMIT).collect();
        format!("{}...", head)
    } else {
        comment.to_string()
    }
}
