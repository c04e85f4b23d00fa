use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
};
use base64::Engine;
use serde::Deserialize;
use std::sync::Arc;

use crate::api::AppState;
use crate::middleware::auth::{AuthUser, Identity};
use crate::models::server::{ServerAsset, ServerResponse, serialize_servers};
use crate::services::server::{
    create_server, delete_server, join_server, leave_server, set_server_asset,
};
use crate::services::server_query::{ServerListParams, resolve_servers};
use crate::utils::error::{AppError, AppResult};

#[derive(Deserialize)]
struct CreateServerRequest {
    name: String,
    category: String,
    description: Option<String>,
}

#[derive(Deserialize)]
struct UploadRequest {
    file_name: String,
    data: String,
}

/// `GET /servers/select` with `category`, `by_user`, `by_serverid`, `qty` and
/// `with_num_members` query parameters.
async fn list_servers(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Query(params): Query<ServerListParams>,
) -> AppResult<Json<Vec<ServerResponse>>> {
    let rows = resolve_servers(&state.db, &params, &identity).await?;
    Ok(Json(serialize_servers(
        rows,
        params.with_num_members(),
        &state.config.media_url,
    )))
}

async fn create(
    State(state): State<Arc<AppState>>,
    AuthUser(username): AuthUser,
    Json(req): Json<CreateServerRequest>,
) -> AppResult<Json<ServerResponse>> {
    let server = create_server(
        &state.db,
        username,
        req.name,
        &req.category,
        req.description,
    )
    .await?;
    Ok(Json(ServerResponse::from_row(
        server,
        true,
        &state.config.media_url,
    )))
}

async fn join(
    State(state): State<Arc<AppState>>,
    AuthUser(username): AuthUser,
    Path(server_id): Path<i64>,
) -> AppResult<Json<ServerResponse>> {
    let server = join_server(&state.db, server_id, username).await?;
    Ok(Json(ServerResponse::from_row(
        server,
        true,
        &state.config.media_url,
    )))
}

async fn leave(
    State(state): State<Arc<AppState>>,
    AuthUser(username): AuthUser,
    Path(server_id): Path<i64>,
) -> AppResult<Json<serde_json::Value>> {
    leave_server(&state.db, server_id, &username).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

async fn delete_server_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(username): AuthUser,
    Path(server_id): Path<i64>,
) -> AppResult<Json<serde_json::Value>> {
    delete_server(&state.db, &state.config.media_root, server_id, &username).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

async fn upload_asset(
    state: &AppState,
    username: &str,
    server_id: i64,
    asset: ServerAsset,
    req: UploadRequest,
) -> AppResult<Json<ServerResponse>> {
    let data = base64::engine::general_purpose::STANDARD
        .decode(&req.data)
        .map_err(|e| AppError::BadRequest(format!("Invalid base64: {}", e)))?;

    let server = set_server_asset(
        &state.db,
        &state.config.media_root,
        server_id,
        username,
        asset,
        &req.file_name,
        &data,
    )
    .await?;

    Ok(Json(ServerResponse::from_row(
        server,
        true,
        &state.config.media_url,
    )))
}

async fn upload_icon(
    State(state): State<Arc<AppState>>,
    AuthUser(username): AuthUser,
    Path(server_id): Path<i64>,
    Json(req): Json<UploadRequest>,
) -> AppResult<Json<ServerResponse>> {
    upload_asset(&state, &username, server_id, ServerAsset::Icon, req).await
}

async fn upload_banner(
    State(state): State<Arc<AppState>>,
    AuthUser(username): AuthUser,
    Path(server_id): Path<i64>,
    Json(req): Json<UploadRequest>,
) -> AppResult<Json<ServerResponse>> {
    upload_asset(&state, &username, server_id, ServerAsset::Banner, req).await
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(create))
        .route("/select", get(list_servers))
        .route("/:server_id", delete(delete_server_handler))
        .route("/:server_id/join", post(join))
        .route("/:server_id/members/me", delete(leave))
        .route("/:server_id/icon", put(upload_icon))
        .route("/:server_id/banner", put(upload_banner))
        .with_state(state)
}
