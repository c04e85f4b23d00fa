#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use guildhall::api::AppState;
use guildhall::config::Config;
use guildhall::database::create_memory_pool;
use guildhall::server::route_builder::build_router;
use guildhall::services::auth::{Credentials, register_user};
use guildhall::services::category::create_category;
use guildhall::services::server::{create_server, join_server};

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub media: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let media = tempfile::tempdir().unwrap();
        let db = create_memory_pool().await.unwrap();
        let state = Arc::new(AppState::new(
            db,
            Config::for_tests(media.path().to_path_buf()),
        ));
        let router = build_router(state.clone());
        Self {
            router,
            state,
            media,
        }
    }

    /// Registers a user and returns their bearer token.
    pub async fn user(&self, username: &str) -> String {
        register_user(
            &self.state.db,
            Credentials {
                username: username.to_string(),
                password: format!("{}-password", username),
            },
            &self.state.jwt_service,
        )
        .await
        .unwrap()
        .token
    }

    pub async fn category(&self, admin: &str, name: &str) {
        create_category(&self.state.db, admin, name.to_string(), None)
            .await
            .unwrap();
    }

    pub async fn server(&self, owner: &str, name: &str, category: &str) -> i64 {
        create_server(
            &self.state.db,
            owner.to_string(),
            name.to_string(),
            category,
            None,
        )
        .await
        .unwrap()
        .id
    }

    pub async fn join(&self, server_id: i64, username: &str) {
        join_server(&self.state.db, server_id, username.to_string())
            .await
            .unwrap();
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }
}

pub fn ids(body: &Value) -> Vec<i64> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|server| server["id"].as_i64().unwrap())
        .collect()
}
