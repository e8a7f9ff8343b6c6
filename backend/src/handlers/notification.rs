//! Notification HTTP handlers

use axum::{
    extract::{Path, State},
    Json,
};
use shared::Notification;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::NotificationService;
use crate::AppState;

/// List the caller's notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<Notification>>> {
    let notifications = NotificationService::new(state.db.clone())
        .list_for_user(user.user_id)
        .await?;
    Ok(Json(notifications))
}

/// Mark a notification as read
pub async fn mark_notification_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(notification_id): Path<Uuid>,
) -> AppResult<Json<Notification>> {
    let notification = NotificationService::new(state.db.clone())
        .mark_read(user.user_id, notification_id)
        .await?;
    Ok(Json(notification))
}
