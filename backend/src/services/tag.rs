//! Report category tags

use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::Tag;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::is_unique_violation;

/// Input for creating or renaming a tag
#[derive(Debug, Deserialize)]
pub struct TagInput {
    pub name: String,
}

#[derive(Debug, sqlx::FromRow)]
struct TagRow {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<TagRow> for Tag {
    fn from(row: TagRow) -> Self {
        Tag {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

#[derive(Clone)]
pub struct TagService {
    db: PgPool,
}

impl TagService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// All tags ordered by name
    pub async fn list_tags(&self) -> AppResult<Vec<Tag>> {
        let rows = sqlx::query_as::<_, TagRow>("SELECT id, name, created_at FROM tags ORDER BY name")
            .fetch_all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Tag::from).collect())
    }

    pub async fn find_tag(&self, tag_id: Uuid) -> AppResult<Option<Tag>> {
        let row = sqlx::query_as::<_, TagRow>("SELECT id, name, created_at FROM tags WHERE id = $1")
            .bind(tag_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(Tag::from))
    }

    pub async fn create_tag(&self, input: TagInput) -> AppResult<Tag> {
        shared::validate_tag_name(&input.name)?;
        let name = input.name.trim();

        let tag: Tag = sqlx::query_as::<_, TagRow>(
            "INSERT INTO tags (name) VALUES ($1) RETURNING id, name, created_at",
        )
        .bind(name)
        .fetch_one(&self.db)
        .await
        .map_err(duplicate_name)?
        .into();

        tracing::info!(tag_id = %tag.id, name = %tag.name, "tag created");
        Ok(tag)
    }

    pub async fn update_tag(&self, tag_id: Uuid, input: TagInput) -> AppResult<Tag> {
        shared::validate_tag_name(&input.name)?;
        let name = input.name.trim();

        let row = sqlx::query_as::<_, TagRow>(
            "UPDATE tags SET name = $1 WHERE id = $2 RETURNING id, name, created_at",
        )
        .bind(name)
        .bind(tag_id)
        .fetch_optional(&self.db)
        .await
        .map_err(duplicate_name)?
        .ok_or_else(|| AppError::not_found("Tag"))?;

        Ok(row.into())
    }

    /// Delete a tag; reports keep existing without a category
    pub async fn delete_tag(&self, tag_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(tag_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Tag"));
        }

        tracing::info!(%tag_id, "tag deleted");
        Ok(())
    }
}

fn duplicate_name(err: sqlx::Error) -> AppError {
    if is_unique_violation(&err) {
        AppError::DuplicateEntry("name".to_string())
    } else {
        AppError::from(err)
    }
}
