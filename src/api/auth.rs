use axum::{
    Json, Router,
    extract::State,
    routing::post,
};
use std::sync::Arc;

use crate::config::Config;
use crate::database::DbPool;
use crate::services::auth::{AuthResponse, Credentials, login_user, register_user};
use crate::utils::error::AppResult;
use crate::utils::jwt::JwtService;

pub struct AppState {
    pub db: DbPool,
    pub jwt_service: Arc<JwtService>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: DbPool, config: Config) -> Self {
        let jwt_service = Arc::new(JwtService::new(&config.secret_key, config.token_ttl));
        Self {
            db,
            jwt_service,
            config: Arc::new(config),
        }
    }
}

pub async fn health_check() -> &'static str {
    "OK"
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Credentials>,
) -> AppResult<Json<AuthResponse>> {
    let response = register_user(&state.db, payload, &state.jwt_service).await?;
    Ok(Json(response))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Credentials>,
) -> AppResult<Json<AuthResponse>> {
    let response = login_user(&state.db, payload, &state.jwt_service).await?;
    Ok(Json(response))
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .with_state(state)
}
