use axum::{Json, Router, extract::State, routing::get};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::AppState;
use crate::middleware::auth::AuthUser;
use crate::models::category::Category;
use crate::services::category::{create_category, list_categories};
use crate::utils::error::AppResult;

#[derive(Deserialize)]
struct CreateCategoryRequest {
    name: String,
    description: Option<String>,
}

async fn list(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Category>>> {
    let categories = list_categories(&state.db).await?;
    Ok(Json(categories))
}

async fn create(
    State(state): State<Arc<AppState>>,
    AuthUser(username): AuthUser,
    Json(req): Json<CreateCategoryRequest>,
) -> AppResult<Json<Category>> {
    let category = create_category(&state.db, &username, req.name, req.description).await?;
    Ok(Json(category))
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .with_state(state)
}
