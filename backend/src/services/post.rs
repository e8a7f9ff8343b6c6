//! Photo report queries and staff triage
//!
//! Supports:
//! - Public and personal report listings
//! - Staff listing with status, tag and priority filters
//! - Status, priority and note updates with reporter notification
//! - Report deletion and CSV export

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    post_summary, PaginatedResponse, Pagination, PhotoPost, PostPriority, PostStatus,
};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::notification::NotificationService;
use crate::services::storage::PhotoStorage;
use crate::services::user::UserService;

/// Number of reports shown on the resident home screen
pub const HOME_POST_LIMIT: i64 = 5;

const POST_SELECT: &str = r#"
    SELECT p.id, p.user_id, u.username, p.title, p.comment, p.photo_path,
           p.tag_id, t.name AS tag_name, p.latitude, p.longitude, p.location_name,
           p.status, p.priority, p.admin_note, p.posted_at
    FROM photo_posts p
    JOIN users u ON u.id = p.user_id
    LEFT JOIN tags t ON t.id = p.tag_id
"#;

/// Report row joined with its author and tag
#[derive(Debug, FromRow)]
struct PostRow {
    id: Uuid,
    user_id: Uuid,
    username: String,
    title: String,
    comment: String,
    photo_path: String,
    tag_id: Option<Uuid>,
    tag_name: Option<String>,
    latitude: Option<Decimal>,
    longitude: Option<Decimal>,
    location_name: Option<String>,
    status: String,
    priority: String,
    admin_note: Option<String>,
    posted_at: DateTime<Utc>,
}

impl From<PostRow> for PhotoPost {
    fn from(row: PostRow) -> Self {
        let status = row.status.parse().unwrap_or_else(|e| {
            tracing::warn!(post_id = %row.id, "stored status rejected: {}", e);
            PostStatus::default()
        });
        let priority = row.priority.parse().unwrap_or_else(|e| {
            tracing::warn!(post_id = %row.id, "stored priority rejected: {}", e);
            PostPriority::default()
        });
        PhotoPost {
            id: row.id,
            user_id: row.user_id,
            username: row.username,
            title: row.title,
            comment: row.comment,
            photo_url: PhotoStorage::url_for(&row.photo_path),
            photo_path: row.photo_path,
            tag_id: row.tag_id,
            tag_name: row.tag_name,
            latitude: row.latitude,
            longitude: row.longitude,
            location_name: row.location_name,
            status,
            priority,
            admin_note: row.admin_note,
            posted_at: row.posted_at,
        }
    }
}

/// Raw staff list query parameters
#[derive(Debug, Default, Deserialize)]
pub struct AdminPostQuery {
    pub status: Option<String>,
    pub tag: Option<String>,
    pub priority: Option<String>,
}

/// Filters applied to the staff report list.
///
/// Values that do not name a known status, tag id or priority are ignored
/// rather than rejected, so a stale link still shows the full list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AdminPostFilter {
    pub status: Option<PostStatus>,
    pub tag: Option<Uuid>,
    pub priority: Option<PostPriority>,
}

impl AdminPostFilter {
    /// Query value selecting reports without a priority
    pub const NO_PRIORITY: &'static str = "__none__";

    pub fn from_query(query: &AdminPostQuery) -> Self {
        let status = query
            .status
            .as_deref()
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse().ok());

        let tag = query
            .tag
            .as_deref()
            .and_then(|s| Uuid::parse_str(s.trim()).ok());

        let priority = match query.priority.as_deref() {
            Some(Self::NO_PRIORITY) => Some(PostPriority::None),
            Some(s) if !s.is_empty() => s.parse().ok(),
            _ => None,
        };

        Self {
            status,
            tag,
            priority,
        }
    }
}

/// Input for the staff status form
#[derive(Debug, Deserialize, Validate)]
pub struct StatusUpdateInput {
    pub status: String,
    pub priority: String,
    #[validate(length(max = 5000, message = "Admin note must be at most 5000 characters"))]
    pub admin_note: Option<String>,
}

/// Outcome of a status update
#[derive(Debug, Serialize)]
pub struct StatusUpdateResult {
    pub post: PhotoPost,
    pub status_changed: bool,
    pub message: String,
    pub message_ja: String,
}

/// Outcome of deleting a report
#[derive(Debug, Serialize)]
pub struct DeletedPost {
    pub id: Uuid,
    pub summary: String,
    pub photo_deleted: bool,
    pub message: String,
    pub message_ja: String,
}

/// Report count for one status
#[derive(Debug, Serialize)]
pub struct StatusCount {
    pub status: PostStatus,
    pub label_ja: &'static str,
    pub count: i64,
}

/// Figures for the staff home screen
#[derive(Debug, Serialize)]
pub struct AdminDashboard {
    pub total_posts: i64,
    pub new_posts: i64,
    pub status_counts: Vec<StatusCount>,
    pub total_users: i64,
}

/// New report ready to be inserted
#[derive(Debug)]
pub struct NewPost {
    pub user_id: Uuid,
    pub title: String,
    pub comment: String,
    pub photo_path: String,
    pub tag_id: Option<Uuid>,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub location_name: Option<String>,
    pub posted_at: DateTime<Utc>,
}

/// One CSV line of the staff export
#[derive(Debug, Serialize)]
struct PostCsvRecord<'a> {
    id: Uuid,
    posted_at: String,
    username: &'a str,
    title: &'a str,
    tag: &'a str,
    status: &'static str,
    priority: &'static str,
    latitude: Option<Decimal>,
    longitude: Option<Decimal>,
    location_name: &'a str,
    comment: &'a str,
    admin_note: &'a str,
    photo_url: &'a str,
}

impl<'a> From<&'a PhotoPost> for PostCsvRecord<'a> {
    fn from(post: &'a PhotoPost) -> Self {
        PostCsvRecord {
            id: post.id,
            posted_at: post.posted_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            username: &post.username,
            title: &post.title,
            tag: post.tag_name.as_deref().unwrap_or(""),
            status: post.status.label_ja(),
            priority: post.priority.label_ja(),
            latitude: post.latitude,
            longitude: post.longitude,
            location_name: post.location_name.as_deref().unwrap_or(""),
            comment: &post.comment,
            admin_note: post.admin_note.as_deref().unwrap_or(""),
            photo_url: &post.photo_url,
        }
    }
}

/// Statuses kept off the public lists
fn unlisted_statuses() -> Vec<&'static str> {
    PostStatus::ALL
        .iter()
        .filter(|status| !status.is_publicly_listed())
        .map(|status| status.as_str())
        .collect()
}

/// Photo report service
#[derive(Clone)]
pub struct PostService {
    db: PgPool,
}

impl PostService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Publicly listed reports, newest first
    pub async fn list_public(&self, pagination: &Pagination) -> AppResult<PaginatedResponse<PhotoPost>> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM photo_posts WHERE status <> ALL($1)",
        )
        .bind(unlisted_statuses())
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "{} WHERE p.status <> ALL($3) ORDER BY p.posted_at DESC LIMIT $1 OFFSET $2",
            POST_SELECT
        ))
        .bind(pagination.limit())
        .bind(pagination.offset())
        .bind(unlisted_statuses())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse {
            data: rows.into_iter().map(PhotoPost::from).collect(),
            pagination: pagination.meta(u64::try_from(total).unwrap_or(0)),
        })
    }

    /// Newest publicly listed reports for the resident home screen
    pub async fn latest_public(&self, limit: i64) -> AppResult<Vec<PhotoPost>> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "{} WHERE p.status <> ALL($2) ORDER BY p.posted_at DESC LIMIT $1",
            POST_SELECT
        ))
        .bind(limit)
        .bind(unlisted_statuses())
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(PhotoPost::from).collect())
    }

    /// All reports of one user, newest first
    pub async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<PhotoPost>> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "{} WHERE p.user_id = $1 ORDER BY p.posted_at DESC",
            POST_SELECT
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(PhotoPost::from).collect())
    }

    /// Staff report list
    pub async fn list_admin(&self, filter: &AdminPostFilter) -> AppResult<Vec<PhotoPost>> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            r#"{}
            WHERE ($1::text IS NULL OR p.status = $1)
              AND ($2::uuid IS NULL OR p.tag_id = $2)
              AND ($3::text IS NULL OR p.priority = $3)
            ORDER BY p.posted_at DESC
            "#,
            POST_SELECT
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.tag)
        .bind(filter.priority.map(|p| p.as_str()))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(PhotoPost::from).collect())
    }

    pub async fn get_post(&self, post_id: Uuid) -> AppResult<PhotoPost> {
        let row = sqlx::query_as::<_, PostRow>(&format!("{} WHERE p.id = $1", POST_SELECT))
            .bind(post_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("Report"))?;

        Ok(row.into())
    }

    /// Insert a confirmed report
    /// Insert a report inside the caller's transaction and return its id
    pub async fn insert_post(conn: &mut PgConnection, post: &NewPost) -> AppResult<Uuid> {
        let post_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO photo_posts
                (user_id, title, comment, photo_path, tag_id, latitude, longitude,
                 location_name, posted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(post.user_id)
        .bind(&post.title)
        .bind(&post.comment)
        .bind(&post.photo_path)
        .bind(post.tag_id)
        .bind(post.latitude)
        .bind(post.longitude)
        .bind(&post.location_name)
        .bind(post.posted_at)
        .fetch_one(conn)
        .await?;

        tracing::info!(%post_id, user_id = %post.user_id, "report created");

        Ok(post_id)
    }

    /// Apply the staff status form and notify the reporter of a status change
    pub async fn update_status(
        &self,
        post_id: Uuid,
        input: StatusUpdateInput,
    ) -> AppResult<StatusUpdateResult> {
        input.validate()?;

        let status: PostStatus = input.status.parse().map_err(|_| AppError::Validation {
            field: "status".to_string(),
            message: format!("Unknown status: {}", input.status),
            message_ja: "対応状況の値が正しくありません。".to_string(),
        })?;
        let priority: PostPriority = input.priority.parse().map_err(|_| AppError::Validation {
            field: "priority".to_string(),
            message: format!("Unknown priority: {}", input.priority),
            message_ja: "優先度の値が正しくありません。".to_string(),
        })?;
        let admin_note = input
            .admin_note
            .map(|note| note.trim().to_string())
            .filter(|note| !note.is_empty());

        let current = self.get_post(post_id).await?;

        sqlx::query(
            "UPDATE photo_posts SET status = $1, priority = $2, admin_note = $3 WHERE id = $4",
        )
        .bind(status.as_str())
        .bind(priority.as_str())
        .bind(&admin_note)
        .bind(post_id)
        .execute(&self.db)
        .await?;

        let status_changed = current.status != status;
        if status_changed {
            let notifications = NotificationService::new(self.db.clone());
            if let Err(e) = notifications
                .notify_status_change(current.user_id, post_id, &current.title, current.status, status)
                .await
            {
                tracing::warn!(%post_id, "could not record status notification: {}", e);
            }
        }

        let post = self.get_post(post_id).await?;

        Ok(StatusUpdateResult {
            post,
            status_changed,
            message: format!("Updated the status of report (ID: {})", post_id),
            message_ja: format!("報告 (ID: {}) のステータスを更新しました。", post_id),
        })
    }

    /// Delete a report, its photo file, and refresh the owner's badge
    pub async fn delete_post(&self, post_id: Uuid, storage: &PhotoStorage) -> AppResult<DeletedPost> {
        let post = self.get_post(post_id).await?;

        sqlx::query("DELETE FROM photo_posts WHERE id = $1")
            .bind(post_id)
            .execute(&self.db)
            .await?;

        let photo_deleted = storage.remove(&post.photo_path).await;

        UserService::new(self.db.clone())
            .refresh_badge_rank(post.user_id)
            .await?;

        let summary = post_summary(post.id, &post.comment);
        tracing::info!(%post_id, summary = %summary, "report deleted");

        Ok(DeletedPost {
            id: post_id,
            message: format!("Deleted report \"{}\"", summary),
            message_ja: format!("報告「{}」を削除しました。", summary),
            summary,
            photo_deleted,
        })
    }

    /// Figures for the staff home screen
    pub async fn admin_dashboard(&self) -> AppResult<AdminDashboard> {
        let counts = sqlx::query_as::<_, (String, i64)>(
            "SELECT status, COUNT(*) FROM photo_posts GROUP BY status",
        )
        .fetch_all(&self.db)
        .await?;

        let status_counts: Vec<StatusCount> = PostStatus::ALL
            .iter()
            .map(|status| StatusCount {
                status: *status,
                label_ja: status.label_ja(),
                count: counts
                    .iter()
                    .find(|(s, _)| s == status.as_str())
                    .map(|(_, c)| *c)
                    .unwrap_or(0),
            })
            .collect();

        let total_posts: i64 = counts.iter().map(|(_, c)| c).sum();
        let new_posts = status_counts
            .iter()
            .find(|c| c.status == PostStatus::New)
            .map(|c| c.count)
            .unwrap_or(0);
        let total_users = UserService::new(self.db.clone()).count_users().await?;

        Ok(AdminDashboard {
            total_posts,
            new_posts,
            status_counts,
            total_users,
        })
    }

    /// Export the staff list as CSV
    pub fn export_to_csv(posts: &[PhotoPost]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for post in posts {
            wtr.serialize(PostCsvRecord::from(post))
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
    }
}
