pub mod auth;
pub mod categories;
pub mod servers;

use axum::Router;
use std::sync::Arc;

pub use auth::AppState;

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", axum::routing::get(auth::health_check))
        .nest("/auth", auth::routes(state.clone()))
        .nest("/servers", servers::routes(state.clone()))
        .nest("/categories", categories::routes(state.clone()))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::auth::identity_middleware,
        ))
}
