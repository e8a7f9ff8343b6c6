//! Resident-facing report listings

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use shared::{BadgeRank, PaginatedResponse, Pagination, PhotoPost, Tag};

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::services::post::HOME_POST_LIMIT;
use crate::services::{PostService, TagService, UserService};
use crate::AppState;

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize)]
pub struct HomeResponse {
    pub username: String,
    pub posts: Vec<PhotoPost>,
}

#[derive(Serialize)]
pub struct MyPageResponse {
    pub posts: Vec<PhotoPost>,
    pub post_count: usize,
    pub badge_rank: BadgeRank,
    pub badge_label: &'static str,
}

/// Resident home: the newest public reports
pub async fn user_home(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<HomeResponse>, AppError> {
    let posts = PostService::new(state.db.clone())
        .latest_public(HOME_POST_LIMIT)
        .await?;

    Ok(Json(HomeResponse {
        username: user.username,
        posts,
    }))
}

/// The caller's own reports and badge
pub async fn my_page(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<MyPageResponse>, AppError> {
    let posts = PostService::new(state.db.clone())
        .list_by_user(user.user_id)
        .await?;
    let profile = UserService::new(state.db.clone()).get_user(user.user_id).await?;

    Ok(Json(MyPageResponse {
        post_count: posts.len(),
        badge_label: profile.badge_rank.label_ja(),
        badge_rank: profile.badge_rank,
        posts,
    }))
}

/// Public report list
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PaginatedResponse<PhotoPost>>, AppError> {
    let pagination = Pagination::from_query(query.page, query.per_page);
    let posts = PostService::new(state.db.clone())
        .list_public(&pagination)
        .await?;

    Ok(Json(posts))
}

/// Category choices for the report form
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<Tag>>, AppError> {
    let tags = TagService::new(state.db.clone()).list_tags().await?;
    Ok(Json(tags))
}
