//! Authentication middleware
//!
//! JWT authentication and staff-only access control middleware

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult, ErrorDetail, ErrorResponse};
use crate::services::auth::decode_access_token;
use crate::AppState;

/// Authenticated user, as verified against the `users` table
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl AuthUser {
    /// Access to the staff management area
    pub fn can_manage(&self) -> bool {
        self.is_staff || self.is_superuser
    }
}

/// Authentication middleware that validates JWT tokens from the
/// Authorization header and stores the [`AuthUser`] in request extensions.
///
/// The account is looked up on every request, so a deleted user or a
/// revoked staff flag takes effect before the token expires.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let bearer = match request.headers().typed_get::<Authorization<Bearer>>() {
        Some(Authorization(bearer)) => bearer,
        None => return unauthorized_response("Missing or invalid Authorization header"),
    };

    let claims = match decode_access_token(bearer.token(), &state.config.jwt.secret) {
        Ok(claims) => claims,
        Err(msg) => return unauthorized_response(&msg),
    };

    let user_id = match Uuid::parse_str(&claims.sub) {
        Ok(id) => id,
        Err(_) => return unauthorized_response("Invalid user ID in token"),
    };

    let account = match load_account(&state.db, user_id).await {
        Ok(Some(account)) => account,
        Ok(None) => {
            tracing::info!(%user_id, "token presented for a deleted account");
            return unauthorized_response("Account no longer exists");
        }
        Err(e) => return e.into_response(),
    };

    request.extensions_mut().insert(account);

    next.run(request).await
}

/// Current username and permission flags of a user
async fn load_account(db: &PgPool, user_id: Uuid) -> AppResult<Option<AuthUser>> {
    let row = sqlx::query_as::<_, (String, bool, bool)>(
        "SELECT username, is_staff, is_superuser FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?;

    Ok(row.map(|(username, is_staff, is_superuser)| AuthUser {
        user_id,
        username,
        is_staff,
        is_superuser,
    }))
}

/// Staff guard; must be layered inside [`auth_middleware`]
pub async fn staff_middleware(request: Request, next: Next) -> Response {
    let user = request.extensions().get::<AuthUser>().cloned();
    match user {
        Some(user) if user.can_manage() => next.run(request).await,
        Some(user) => {
            tracing::warn!(user_id = %user.user_id, path = %request.uri().path(), "non-staff user denied");
            AppError::InsufficientPermissions.into_response()
        }
        None => unauthorized_response("Authentication required"),
    }
}

/// Create unauthorized response
fn unauthorized_response(message: &str) -> Response {
    AppError::Unauthorized {
        message: message.to_string(),
        message_ja: "ログインが必要です。".to_string(),
    }
    .into_response()
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| {
                let error = ErrorResponse {
                    error: ErrorDetail {
                        code: "UNAUTHORIZED".to_string(),
                        message_en: "Authentication required".to_string(),
                        message_ja: "ログインが必要です。".to_string(),
                        field: None,
                    },
                };
                (StatusCode::UNAUTHORIZED, Json(error))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_manage() {
        let mut user = AuthUser {
            user_id: Uuid::nil(),
            username: "taro".to_string(),
            is_staff: false,
            is_superuser: false,
        };
        assert!(!user.can_manage());
        user.is_staff = true;
        assert!(user.can_manage());
        user.is_staff = false;
        user.is_superuser = true;
        assert!(user.can_manage());
    }
}
