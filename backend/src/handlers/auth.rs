//! Authentication handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use shared::{HomeDestination, User};

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::services::auth::{AuthTokens, LoginInput, SessionResponse, SignupInput};
use crate::services::{AuthService, UserService};
use crate::AppState;

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub revoked_tokens: u64,
    pub message: String,
    pub message_ja: String,
}

#[derive(Serialize)]
pub struct MeResponse {
    pub user: User,
    pub home: HomeDestination,
}

/// Signup endpoint handler
pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupInput>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let session = auth_service.signup(body).await?;

    Ok((StatusCode::CREATED, Json(session)))
}

/// Login endpoint handler
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginInput>,
) -> Result<Json<SessionResponse>, AppError> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let session = auth_service.login(body).await?;

    Ok(Json(session))
}

/// Refresh token endpoint handler
pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<AuthTokens>, AppError> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let tokens = auth_service.refresh_token(&body.refresh_token).await?;

    Ok(Json(tokens))
}

/// Logout endpoint handler
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<LogoutResponse>, AppError> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let revoked_tokens = auth_service.logout(user.user_id).await?;

    Ok(Json(LogoutResponse {
        revoked_tokens,
        message: "Logged out".to_string(),
        message_ja: "ログアウトしました。".to_string(),
    }))
}

/// Current user profile and the screen to land on after login
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<MeResponse>, AppError> {
    let user = UserService::new(state.db.clone()).get_user(user.user_id).await?;

    Ok(Json(MeResponse {
        home: user.home(),
        user,
    }))
}
