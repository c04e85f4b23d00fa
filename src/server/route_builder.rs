use axum::{Router, extract::DefaultBodyLimit, http::StatusCode};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::api::AppState;
use crate::config::Config;
use crate::database;

const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Router for an already initialized state: `/api` plus media files.
pub fn build_router(state: Arc<AppState>) -> Router {
    let media_url = format!("/{}", state.config.media_url.trim_matches('/'));
    let media = ServeDir::new(&state.config.media_root);

    let api_routes = crate::api::routes(state);

    Router::new()
        .nest("/api", api_routes)
        .nest_service(&media_url, media)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .fallback(|| async { (StatusCode::NOT_FOUND, "Not found") })
}

pub async fn register_routes(config: Config) -> anyhow::Result<Router> {
    let db = database::create_pool(&config.database_url).await?;

    tracing::info!("Database connected and migrations applied");

    tokio::fs::create_dir_all(&config.media_root).await?;

    tracing::info!("Serving media from {:?} at {}", config.media_root, config.media_url);

    let state = Arc::new(AppState::new(db, config));

    Ok(build_router(state))
}
