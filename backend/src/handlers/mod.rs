//! HTTP handlers for the Machirepo platform

pub mod admin;
pub mod auth;
pub mod drafts;
pub mod health;
pub mod notification;
pub mod resident;

pub use auth::{login, logout, me, refresh, signup};
pub use drafts::{
    confirm_draft, confirm_preview, discard_draft, draft_photo, get_draft, location_step,
    save_draft, update_location,
};
pub use health::{health_check, root};
pub use notification::{list_notifications, mark_notification_read};
pub use resident::{list_posts, list_tags, my_page, user_home};
