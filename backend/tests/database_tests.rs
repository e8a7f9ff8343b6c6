//! Database-backed tests
//!
//! Each test gets a fresh, migrated database from `#[sqlx::test]`
//! (`DATABASE_URL` must point at a Postgres server). Covers:
//! - Signup uniqueness and login
//! - The submission wizard from step 1 to the stored report
//! - Account checks in the auth middleware
//! - Staff deletion of users and their photo files

mod common;

use std::path::Path;
use std::str::FromStr;

use axum::http::StatusCode;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use machirepo_backend::error::AppError;
use machirepo_backend::services::auth::{LoginInput, SignupInput};
use machirepo_backend::services::draft::{CoordinateValue, DetailsInput};
use machirepo_backend::services::tag::TagInput;
use machirepo_backend::services::{
    AuthService, DraftService, PhotoStorage, TagService, UserService,
};
use rust_decimal::Decimal;
use shared::{BadgeRank, PhotoUpload, WizardStep};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use common::{app_with_pool, json_body, request, test_config, token_for_user};

const PNG_HEADER: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_HEADER: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xE0];

// ============================================================================
// Fixtures
// ============================================================================

async fn signup(pool: &PgPool, username: &str, email: &str) -> Uuid {
    AuthService::new(pool.clone(), &test_config())
        .signup(SignupInput {
            username: username.to_string(),
            email: email.to_string(),
            password: "kawasaki-2024".to_string(),
        })
        .await
        .unwrap()
        .user
        .id
}

async fn staff(pool: &PgPool) -> Uuid {
    AuthService::new(pool.clone(), &test_config())
        .create_superuser("yakuba", "yakuba@city.example.jp", "kawasaki-2024")
        .await
        .unwrap()
        .id
}

async fn tag(pool: &PgPool, name: &str) -> Uuid {
    TagService::new(pool.clone())
        .create_tag(TagInput {
            name: name.to_string(),
        })
        .await
        .unwrap()
        .id
}

fn photo(bytes: &[u8]) -> PhotoUpload {
    PhotoUpload {
        filename: "bench.png".to_string(),
        data_base64: BASE64.encode(bytes),
    }
}

fn details(tag_id: Uuid, upload: Option<PhotoUpload>, lat: &str, lng: &str) -> DetailsInput {
    DetailsInput {
        title: "ベンチが壊れている".to_string(),
        comment: "公園のベンチの板が割れています".to_string(),
        tag_id: Some(tag_id),
        photo: upload,
        latitude: Some(CoordinateValue::Text(lat.to_string())),
        longitude: Some(CoordinateValue::Text(lng.to_string())),
    }
}

fn count_files(dir: &Path) -> usize {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .map(|entry| {
                let path = entry.path();
                if path.is_dir() {
                    count_files(&path)
                } else {
                    1
                }
            })
            .sum(),
        Err(_) => 0,
    }
}

// ============================================================================
// Accounts
// ============================================================================

#[sqlx::test]
async fn test_duplicate_email_differs_only_in_case(pool: PgPool) {
    signup(&pool, "hanako", "Hanako@Example.jp").await;

    let err = AuthService::new(pool.clone(), &test_config())
        .signup(SignupInput {
            username: "hanako2".to_string(),
            email: "hanako@EXAMPLE.JP".to_string(),
            password: "kawasaki-2024".to_string(),
        })
        .await
        .unwrap_err();

    let (status, detail) = err.status_and_detail();
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(detail.code, "DUPLICATE_ENTRY");
    assert_eq!(detail.field.as_deref(), Some("email"));
    assert_eq!(detail.message_ja, "このメールアドレスは既に使用されています。");
}

#[sqlx::test]
async fn test_duplicate_username_rejected(pool: PgPool) {
    signup(&pool, "hanako", "hanako@example.jp").await;

    let err = AuthService::new(pool.clone(), &test_config())
        .signup(SignupInput {
            username: "hanako".to_string(),
            email: "other@example.jp".to_string(),
            password: "kawasaki-2024".to_string(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::DuplicateEntry(ref field) if field == "username"));
}

#[sqlx::test]
async fn test_login_ignores_email_case(pool: PgPool) {
    let user_id = signup(&pool, "taro", "taro@example.jp").await;
    let auth = AuthService::new(pool.clone(), &test_config());

    let session = auth
        .login(LoginInput {
            email: "TARO@example.jp".to_string(),
            password: "kawasaki-2024".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(session.user.id, user_id);
    assert!(session.user.last_login_at.is_some());

    let err = auth
        .login(LoginInput {
            email: "taro@example.jp".to_string(),
            password: "wrong-password".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidCredentials));
}

// ============================================================================
// Submission wizard
// ============================================================================

#[sqlx::test]
async fn test_step_one_photo_carry_over_and_replacement(pool: PgPool) {
    let media = tempfile::tempdir().unwrap();
    let storage = PhotoStorage::new(media.path(), 1024);
    let drafts = DraftService::new(pool.clone(), storage.clone());
    let user_id = signup(&pool, "hanako", "hanako@example.jp").await;
    let tag_id = tag(&pool, "公園").await;

    let first = drafts
        .save_details(user_id, details(tag_id, Some(photo(&PNG_HEADER)), "", ""))
        .await
        .unwrap();
    assert_eq!(first.next_step, WizardStep::Location);
    let first_path = first.draft.photo_path.clone().unwrap();
    assert!(storage.exists(&first_path).await);

    // No new upload: the stored photo is kept
    let again = drafts
        .save_details(user_id, details(tag_id, None, "", ""))
        .await
        .unwrap();
    assert_eq!(again.draft.photo_path.as_deref(), Some(first_path.as_str()));
    assert!(storage.exists(&first_path).await);

    // A new upload replaces and removes the old one
    let replaced = drafts
        .save_details(user_id, details(tag_id, Some(photo(&JPEG_HEADER)), "", ""))
        .await
        .unwrap();
    let new_path = replaced.draft.photo_path.unwrap();
    assert_ne!(new_path, first_path);
    assert!(new_path.ends_with(".jpg"));
    assert!(storage.exists(&new_path).await);
    assert!(!storage.exists(&first_path).await);
}

#[sqlx::test]
async fn test_step_one_without_any_photo_is_rejected(pool: PgPool) {
    let media = tempfile::tempdir().unwrap();
    let drafts = DraftService::new(pool.clone(), PhotoStorage::new(media.path(), 1024));
    let user_id = signup(&pool, "hanako", "hanako@example.jp").await;
    let tag_id = tag(&pool, "道路").await;

    let err = drafts
        .save_details(user_id, details(tag_id, None, "", ""))
        .await
        .unwrap_err();
    let (_, detail) = err.status_and_detail();
    assert_eq!(detail.field.as_deref(), Some("photo"));
    assert!(drafts.find_draft(user_id).await.unwrap().is_none());
}

#[sqlx::test]
async fn test_out_of_range_browser_location_goes_to_manual_step(pool: PgPool) {
    let media = tempfile::tempdir().unwrap();
    let drafts = DraftService::new(pool.clone(), PhotoStorage::new(media.path(), 1024));
    let user_id = signup(&pool, "hanako", "hanako@example.jp").await;
    let tag_id = tag(&pool, "道路").await;

    let step = drafts
        .save_details(
            user_id,
            details(tag_id, Some(photo(&PNG_HEADER)), "12345678", "139.7671"),
        )
        .await
        .unwrap();
    assert_eq!(step.next_step, WizardStep::Location);
    assert_eq!(step.draft.latitude, None);

    let location = drafts.location_step(user_id).await.unwrap();
    assert_eq!(location.next_step, WizardStep::Location);
}

#[sqlx::test]
async fn test_confirm_stores_report_and_clears_draft(pool: PgPool) {
    let media = tempfile::tempdir().unwrap();
    let storage = PhotoStorage::new(media.path(), 1024);
    let drafts = DraftService::new(pool.clone(), storage.clone());
    let user_id = signup(&pool, "hanako", "hanako@example.jp").await;
    let tag_id = tag(&pool, "公園").await;

    let step = drafts
        .save_details(
            user_id,
            details(
                tag_id,
                Some(photo(&PNG_HEADER)),
                "35.68123456789012345",
                "139.7671",
            ),
        )
        .await
        .unwrap();
    assert_eq!(step.next_step, WizardStep::Confirm);
    let temp_path = step.draft.photo_path.unwrap();

    let report = drafts.confirm(user_id).await.unwrap();
    assert_eq!(report.next_step, WizardStep::Done);
    assert_eq!(report.post.user_id, user_id);
    assert_eq!(report.post.tag_id, Some(tag_id));
    assert_eq!(report.post.tag_name.as_deref(), Some("公園"));
    assert_eq!(
        report.post.latitude,
        Some(Decimal::from_str("35.6812345678901").unwrap())
    );
    assert!(report.post.photo_path.starts_with("photos/"));
    assert!(storage.exists(&report.post.photo_path).await);
    assert!(!storage.exists(&temp_path).await);
    assert!(drafts.find_draft(user_id).await.unwrap().is_none());
}

#[sqlx::test]
async fn test_failed_confirm_keeps_draft_photo_for_retry(pool: PgPool) {
    let media = tempfile::tempdir().unwrap();
    let storage = PhotoStorage::new(media.path(), 1024);
    let drafts = DraftService::new(pool.clone(), storage.clone());
    let user_id = signup(&pool, "hanako", "hanako@example.jp").await;
    let tag_id = tag(&pool, "公園").await;

    let step = drafts
        .save_details(user_id, details(tag_id, Some(photo(&PNG_HEADER)), "35.6", "139.7"))
        .await
        .unwrap();
    let temp_path = step.draft.photo_path.unwrap();

    sqlx::query("ALTER TABLE photo_posts ADD CONSTRAINT refuse_reports CHECK (false) NOT VALID")
        .execute(&pool)
        .await
        .unwrap();

    assert!(drafts.confirm(user_id).await.is_err());
    assert!(storage.exists(&temp_path).await);
    assert_eq!(count_files(&media.path().join("photos")), 0);
    assert!(drafts.find_draft(user_id).await.unwrap().is_some());

    sqlx::query("ALTER TABLE photo_posts DROP CONSTRAINT refuse_reports")
        .execute(&pool)
        .await
        .unwrap();

    let report = drafts.confirm(user_id).await.unwrap();
    assert!(storage.exists(&report.post.photo_path).await);
    assert!(!storage.exists(&temp_path).await);
}

#[sqlx::test]
async fn test_tenth_report_earns_bronze_badge(pool: PgPool) {
    let media = tempfile::tempdir().unwrap();
    let drafts = DraftService::new(pool.clone(), PhotoStorage::new(media.path(), 1024));
    let users = UserService::new(pool.clone());
    let user_id = signup(&pool, "hanako", "hanako@example.jp").await;
    let tag_id = tag(&pool, "公園").await;

    for n in 1..=10 {
        drafts
            .save_details(user_id, details(tag_id, Some(photo(&PNG_HEADER)), "35.6", "139.7"))
            .await
            .unwrap();
        drafts.confirm(user_id).await.unwrap();

        let expected = if n < 10 {
            BadgeRank::None
        } else {
            BadgeRank::Bronze
        };
        assert_eq!(users.get_user(user_id).await.unwrap().badge_rank, expected);
    }
}

// ============================================================================
// Auth middleware against stored accounts
// ============================================================================

#[sqlx::test]
async fn test_staff_claim_is_checked_against_account(pool: PgPool) {
    let media = tempfile::tempdir().unwrap();
    let user_id = signup(&pool, "hanako", "hanako@example.jp").await;
    let token = token_for_user(user_id, "hanako", true);

    let routes = [
        ("GET", "/api/v1/manage/home"),
        ("GET", "/api/v1/manage/users"),
        ("GET", "/api/v1/manage/posts/export"),
        ("POST", "/api/v1/manage/tags"),
    ];
    for (method, uri) in routes {
        let response = app_with_pool(pool.clone(), media.path())
            .oneshot(request(method, uri, Some(&token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{} {}", method, uri);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "INSUFFICIENT_PERMISSIONS");
    }
}

#[sqlx::test]
async fn test_staff_passes_guard(pool: PgPool) {
    let media = tempfile::tempdir().unwrap();
    let staff_id = staff(&pool).await;
    let token = token_for_user(staff_id, "yakuba", true);

    // The malformed body is rejected by the handler's extractor, which only
    // runs once both guards have let the request through
    let response = app_with_pool(pool, media.path())
        .oneshot(request(
            "PUT",
            "/api/v1/manage/posts/00000000-0000-0000-0000-000000000000/status",
            Some(&token),
            Some("{not json"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test]
async fn test_deleted_account_token_is_rejected(pool: PgPool) {
    let media = tempfile::tempdir().unwrap();
    let staff_id = staff(&pool).await;
    let user_id = signup(&pool, "hanako", "hanako@example.jp").await;
    let token = token_for_user(user_id, "hanako", false);

    let response = app_with_pool(pool.clone(), media.path())
        .oneshot(request("GET", "/api/v1/mypage", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    UserService::new(pool.clone())
        .delete_user(staff_id, user_id, &PhotoStorage::new(media.path(), 1024))
        .await
        .unwrap();

    for (method, uri) in [("GET", "/api/v1/mypage"), ("POST", "/api/v1/reports/draft")] {
        let response = app_with_pool(pool.clone(), media.path())
            .oneshot(request(method, uri, Some(&token), Some("{}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{} {}", method, uri);
    }
}

// ============================================================================
// Staff user deletion
// ============================================================================

#[sqlx::test]
async fn test_deleting_user_removes_photo_files(pool: PgPool) {
    let media = tempfile::tempdir().unwrap();
    let storage = PhotoStorage::new(media.path(), 1024);
    let drafts = DraftService::new(pool.clone(), storage.clone());
    let staff_id = staff(&pool).await;
    let user_id = signup(&pool, "hanako", "hanako@example.jp").await;
    let tag_id = tag(&pool, "公園").await;

    drafts
        .save_details(user_id, details(tag_id, Some(photo(&PNG_HEADER)), "35.6", "139.7"))
        .await
        .unwrap();
    let report = drafts.confirm(user_id).await.unwrap();
    let open = drafts
        .save_details(user_id, details(tag_id, Some(photo(&PNG_HEADER)), "", ""))
        .await
        .unwrap();
    let temp_path = open.draft.photo_path.unwrap();

    let deleted = UserService::new(pool.clone())
        .delete_user(staff_id, user_id, &storage)
        .await
        .unwrap();

    assert_eq!(deleted.username, "hanako");
    assert_eq!(deleted.photos_deleted, 2);
    assert!(!storage.exists(&report.post.photo_path).await);
    assert!(!storage.exists(&temp_path).await);
    assert_eq!(count_files(media.path()), 0);
}

#[sqlx::test]
async fn test_staff_cannot_delete_self(pool: PgPool) {
    let media = tempfile::tempdir().unwrap();
    let staff_id = staff(&pool).await;

    let err = UserService::new(pool.clone())
        .delete_user(staff_id, staff_id, &PhotoStorage::new(media.path(), 1024))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::SelfDeletion));
    assert!(UserService::new(pool).get_user(staff_id).await.is_ok());
}
