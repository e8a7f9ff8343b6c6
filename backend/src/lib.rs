//! Machirepo - municipal problem reporting backend
//!
//! Residents report local problems with a geotagged photo, and municipal
//! staff triage, prioritize and resolve the reports.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod external;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;

pub use config::Config;
use external::ImageClassifierClient;
use services::storage::{PhotoStorage, MEDIA_URL_PREFIX, PHOTO_DIR};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
    pub storage: PhotoStorage,
    pub classifier: Option<ImageClassifierClient>,
}

impl AppState {
    /// Build state from configuration and an open pool
    pub fn new(db: sqlx::PgPool, config: Config) -> error::AppResult<Self> {
        let storage = PhotoStorage::from_config(&config.media);
        let classifier = ImageClassifierClient::from_config(&config.classifier)?;
        Ok(Self {
            db,
            config: Arc::new(config),
            storage,
            classifier,
        })
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Draft uploads under tmp/ stay private
    let media = ServeDir::new(state.storage.public_dir());
    let media_path = format!("{}/{}", MEDIA_URL_PREFIX, PHOTO_DIR);

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .nest_service(&media_path, media)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}
