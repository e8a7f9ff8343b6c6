//! Route definitions for the Machirepo platform

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::{
    handlers,
    middleware::{auth_middleware, staff_middleware},
    AppState,
};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public)
        .nest("/auth", auth_routes(state.clone()))
        // Public listings
        .route("/posts", get(handlers::list_posts))
        .route("/tags", get(handlers::list_tags))
        // Protected routes - resident screens
        .merge(resident_routes(state.clone()))
        // Protected routes - submission wizard
        .nest("/reports/draft", draft_routes(state.clone()))
        // Protected routes - notifications
        .nest("/notifications", notification_routes(state.clone()))
        // Protected routes - staff area
        .nest("/manage", manage_routes(state))
}

/// Authentication routes
fn auth_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/logout", post(handlers::logout))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/signup", post(handlers::signup))
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
        .merge(protected)
}

/// Resident screens (protected)
fn resident_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/me", get(handlers::me))
        .route("/home", get(handlers::user_home))
        .route("/mypage", get(handlers::my_page))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Report submission wizard (protected)
fn draft_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(handlers::save_draft)
                .get(handlers::get_draft)
                .delete(handlers::discard_draft),
        )
        .route("/photo", get(handlers::draft_photo))
        .route(
            "/location",
            get(handlers::location_step).put(handlers::update_location),
        )
        .route(
            "/confirm",
            get(handlers::confirm_preview).post(handlers::confirm_draft),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Notification routes (protected)
fn notification_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_notifications))
        .route(
            "/:notification_id/read",
            post(handlers::mark_notification_read),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Staff area (protected, staff only)
fn manage_routes(state: AppState) -> Router<AppState> {
    use handlers::admin;

    Router::new()
        .route("/home", get(admin::admin_home))
        .route("/users", get(admin::list_users))
        .route("/users/:user_id", delete(admin::delete_user))
        .route("/posts", get(admin::list_posts))
        .route("/posts/export", get(admin::export_posts))
        .route(
            "/posts/:post_id",
            get(admin::get_post).delete(admin::delete_post),
        )
        .route("/posts/:post_id/status", put(admin::update_post_status))
        .route("/tags", post(admin::create_tag))
        .route(
            "/tags/:tag_id",
            put(admin::update_tag).delete(admin::delete_tag),
        )
        // The last layer added runs first: auth, then the staff check
        .route_layer(middleware::from_fn(staff_middleware))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
