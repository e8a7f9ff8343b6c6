//! User account management and badge ranks

use chrono::{DateTime, Utc};
use shared::{BadgeRank, User};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::storage::PhotoStorage;

/// Column list matching [`UserRow`]
pub(crate) const USER_COLUMNS: &str = "id, username, email, password_hash, is_staff, \
     is_superuser, badge_rank, date_joined, last_login_at";

/// User row from database, including the password hash
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub badge_rank: String,
    pub date_joined: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        let badge_rank = row.badge_rank.parse().unwrap_or_else(|e| {
            tracing::warn!(user_id = %row.id, "stored badge rank rejected: {}", e);
            BadgeRank::None
        });
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            is_staff: row.is_staff,
            is_superuser: row.is_superuser,
            badge_rank,
            date_joined: row.date_joined,
            last_login_at: row.last_login_at,
        }
    }
}

/// Result of deleting a user from the staff screen
#[derive(Debug, serde::Serialize)]
pub struct DeletedUser {
    pub id: Uuid,
    pub username: String,
    pub photos_deleted: usize,
    pub message: String,
    pub message_ja: String,
}

/// User service for profile lookups, staff user management and badges
#[derive(Clone)]
pub struct UserService {
    db: PgPool,
}

impl UserService {
    /// Create a new UserService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Get a user by ID
    pub async fn get_user(&self, user_id: Uuid) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

        Ok(row.into())
    }

    /// List every user except the requesting one, newest first
    pub async fn list_users_except(&self, exclude_id: Uuid) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id <> $1 ORDER BY date_joined DESC",
            USER_COLUMNS
        ))
        .bind(exclude_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    /// Delete a user account; their reports and draft are removed with it,
    /// photo files included
    pub async fn delete_user(
        &self,
        acting_user_id: Uuid,
        user_id: Uuid,
        storage: &PhotoStorage,
    ) -> AppResult<DeletedUser> {
        let username = sqlx::query_scalar::<_, String>("SELECT username FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        if user_id == acting_user_id {
            return Err(AppError::SelfDeletion);
        }

        let mut tx = self.db.begin().await?;
        let photo_paths = sqlx::query_scalar::<_, String>(
            r#"
            SELECT photo_path FROM photo_posts WHERE user_id = $1
            UNION ALL
            SELECT photo_path FROM report_drafts WHERE user_id = $1 AND photo_path IS NOT NULL
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        let mut photos_deleted = 0;
        for path in &photo_paths {
            if storage.remove(path).await {
                photos_deleted += 1;
            }
        }

        tracing::info!(%user_id, %acting_user_id, photos_deleted, "user deleted by staff");

        Ok(DeletedUser {
            id: user_id,
            photos_deleted,
            message: format!("Deleted user \"{}\"", username),
            message_ja: format!("ユーザー「{}」を削除しました。", username),
            username,
        })
    }

    /// Count all registered users
    pub async fn count_users(&self) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }

    /// Recompute a user's badge rank from their current post count
    pub async fn refresh_badge_rank(&self, user_id: Uuid) -> AppResult<BadgeRank> {
        let post_count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM photo_posts WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.db)
                .await?;

        let rank = BadgeRank::for_post_count(post_count);

        let result = sqlx::query(
            "UPDATE users SET badge_rank = $1 WHERE id = $2 AND badge_rank <> $1",
        )
        .bind(rank.as_str())
        .bind(user_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() > 0 {
            tracing::info!(%user_id, post_count, badge = rank.as_str(), "badge rank changed");
        }

        Ok(rank)
    }
}
