//! Report submission wizard handlers

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::services::draft::{
    ConfirmPreview, DetailsInput, DraftStep, LocationInput, SubmittedReport,
};
use crate::services::DraftService;
use crate::AppState;

#[derive(Serialize)]
pub struct DiscardResponse {
    pub discarded: bool,
}

fn draft_service(state: &AppState) -> DraftService {
    DraftService::new(state.db.clone(), state.storage.clone())
}

/// Step 1: photo and details
pub async fn save_draft(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<DetailsInput>,
) -> Result<Json<DraftStep>, AppError> {
    let step = draft_service(&state).save_details(user.user_id, input).await?;
    Ok(Json(step))
}

/// Current draft
pub async fn get_draft(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<shared::ReportDraft>, AppError> {
    let draft = draft_service(&state).get_draft(user.user_id).await?;
    Ok(Json(draft))
}

/// Start over
pub async fn discard_draft(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<DiscardResponse>, AppError> {
    let discarded = draft_service(&state).discard(user.user_id).await?;
    Ok(Json(DiscardResponse { discarded }))
}

/// Photo of the open draft, visible to its owner only
pub async fn draft_photo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let (format, bytes) = draft_service(&state).draft_photo(user.user_id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, format.mime_type()),
            (header::CACHE_CONTROL, "private, no-store"),
        ],
        bytes,
    ))
}

/// Step 2: skip or show the manual location form
pub async fn location_step(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<DraftStep>, AppError> {
    let step = draft_service(&state).location_step(user.user_id).await?;
    Ok(Json(step))
}

/// Step 2: manual location
pub async fn update_location(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<LocationInput>,
) -> Result<Json<DraftStep>, AppError> {
    let step = draft_service(&state)
        .update_location(user.user_id, input)
        .await?;
    Ok(Json(step))
}

/// Step 3: preview
pub async fn confirm_preview(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ConfirmPreview>, AppError> {
    let preview = draft_service(&state).confirm_preview(user.user_id).await?;
    Ok(Json(preview))
}

/// Step 3: submit
pub async fn confirm_draft(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<(StatusCode, Json<SubmittedReport>), AppError> {
    let report = draft_service(&state).confirm(user.user_id).await?;
    Ok((StatusCode::CREATED, Json(report)))
}
