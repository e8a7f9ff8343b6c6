//! Staff management handlers
//!
//! Every route here sits behind `staff_middleware`.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use shared::{PhotoPost, PostPriority, PostStatus, Tag, User};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::external::Classification;
use crate::middleware::CurrentUser;
use crate::services::post::{
    AdminDashboard, AdminPostFilter, AdminPostQuery, DeletedPost, StatusUpdateInput,
    StatusUpdateResult,
};
use crate::services::tag::TagInput;
use crate::services::user::DeletedUser;
use crate::services::{PostService, TagService, UserService};
use crate::AppState;

#[derive(Serialize)]
pub struct Choice {
    pub value: &'static str,
    pub label: &'static str,
}

#[derive(Serialize)]
pub struct AdminPostList {
    pub posts: Vec<PhotoPost>,
    pub filters: AdminPostFilter,
    pub tags: Vec<Tag>,
    pub status_choices: Vec<Choice>,
    pub priority_choices: Vec<Choice>,
}

#[derive(Serialize)]
pub struct StatusForm {
    pub status: PostStatus,
    pub priority: PostPriority,
    pub admin_note: Option<String>,
}

#[derive(Serialize)]
pub struct AdminPostDetail {
    pub post: PhotoPost,
    pub form: StatusForm,
    pub status_choices: Vec<Choice>,
    pub priority_choices: Vec<Choice>,
    pub classification: Option<Classification>,
    pub suggested_tag: Option<Tag>,
}

fn status_choices() -> Vec<Choice> {
    PostStatus::ALL
        .iter()
        .map(|s| Choice {
            value: s.as_str(),
            label: s.label_ja(),
        })
        .collect()
}

fn priority_choices() -> Vec<Choice> {
    PostPriority::ALL
        .iter()
        .map(|p| Choice {
            value: p.as_str(),
            label: p.label_ja(),
        })
        .collect()
}

/// Staff home figures
pub async fn admin_home(State(state): State<AppState>) -> AppResult<Json<AdminDashboard>> {
    let dashboard = PostService::new(state.db.clone()).admin_dashboard().await?;
    Ok(Json(dashboard))
}

/// All users except the caller
pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<User>>> {
    let users = UserService::new(state.db.clone())
        .list_users_except(user.user_id)
        .await?;
    Ok(Json(users))
}

pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<DeletedUser>> {
    let deleted = UserService::new(state.db.clone())
        .delete_user(user.user_id, user_id, &state.storage)
        .await?;
    Ok(Json(deleted))
}

/// Filtered report list
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<AdminPostQuery>,
) -> AppResult<Json<AdminPostList>> {
    let filters = AdminPostFilter::from_query(&query);
    let posts = PostService::new(state.db.clone())
        .list_admin(&filters)
        .await?;
    let tags = TagService::new(state.db.clone()).list_tags().await?;

    Ok(Json(AdminPostList {
        posts,
        filters,
        tags,
        status_choices: status_choices(),
        priority_choices: priority_choices(),
    }))
}

/// Filtered report list as CSV
pub async fn export_posts(
    State(state): State<AppState>,
    Query(query): Query<AdminPostQuery>,
) -> AppResult<impl IntoResponse> {
    let filters = AdminPostFilter::from_query(&query);
    let posts = PostService::new(state.db.clone())
        .list_admin(&filters)
        .await?;
    let csv = PostService::export_to_csv(&posts)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"reports.csv\"",
            ),
        ],
        csv,
    ))
}

/// Report detail with an optional category suggestion
pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> AppResult<Json<AdminPostDetail>> {
    let post = PostService::new(state.db.clone()).get_post(post_id).await?;

    let classification = match &state.classifier {
        Some(client) => match state.storage.read(&post.photo_path).await {
            Ok(bytes) => match client.classify_image(&post.photo_path, &bytes).await {
                Ok(result) => Some(result),
                Err(e) => {
                    tracing::warn!(%post_id, "image classification failed: {}", e);
                    None
                }
            },
            Err(e) => {
                tracing::warn!(%post_id, "photo unavailable for classification: {}", e);
                None
            }
        },
        None => None,
    };

    let suggested_tag = match &classification {
        Some(result) => {
            let tags = TagService::new(state.db.clone()).list_tags().await?;
            result.suggested_tag(&tags).cloned()
        }
        None => None,
    };

    Ok(Json(AdminPostDetail {
        form: StatusForm {
            status: post.status,
            priority: post.priority,
            admin_note: post.admin_note.clone(),
        },
        post,
        status_choices: status_choices(),
        priority_choices: priority_choices(),
        classification,
        suggested_tag,
    }))
}

pub async fn update_post_status(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Json(input): Json<StatusUpdateInput>,
) -> AppResult<Json<StatusUpdateResult>> {
    let result = PostService::new(state.db.clone())
        .update_status(post_id, input)
        .await?;
    Ok(Json(result))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> AppResult<Json<DeletedPost>> {
    let deleted = PostService::new(state.db.clone())
        .delete_post(post_id, &state.storage)
        .await?;
    Ok(Json(deleted))
}

pub async fn create_tag(
    State(state): State<AppState>,
    Json(input): Json<TagInput>,
) -> AppResult<(StatusCode, Json<Tag>)> {
    let tag = TagService::new(state.db.clone()).create_tag(input).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

pub async fn update_tag(
    State(state): State<AppState>,
    Path(tag_id): Path<Uuid>,
    Json(input): Json<TagInput>,
) -> AppResult<Json<Tag>> {
    let tag = TagService::new(state.db.clone())
        .update_tag(tag_id, input)
        .await?;
    Ok(Json(tag))
}

pub async fn delete_tag(
    State(state): State<AppState>,
    Path(tag_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    TagService::new(state.db.clone()).delete_tag(tag_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
