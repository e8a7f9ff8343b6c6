//! Business logic services for the Machirepo platform

pub mod auth;
pub mod draft;
pub mod notification;
pub mod post;
pub mod storage;
pub mod tag;
pub mod user;

pub use auth::AuthService;
pub use draft::DraftService;
pub use notification::NotificationService;
pub use post::PostService;
pub use storage::PhotoStorage;
pub use tag::TagService;
pub use user::UserService;

/// Constraint name of a unique violation, if that is what the error is
pub(crate) fn unique_violation(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            Some(db_err.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    unique_violation(err).is_some()
}
