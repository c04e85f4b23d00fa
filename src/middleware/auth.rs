use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use sqlx::Row;
use std::sync::Arc;

use crate::api::AppState;
use crate::utils::error::AppError;

/// Who is making the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    User(String),
}

impl Identity {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::User(_))
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Identity::User(username) => Some(username.as_str()),
            Identity::Anonymous => None,
        }
    }
}

/// An identity that is known to be a logged in user.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

/// Resolves the bearer token, if any, into an [`Identity`] stored in the
/// request extensions. Requests without an `Authorization` header proceed
/// anonymously; a header that does not carry a valid token is rejected.
pub async fn identity_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .map(|value| value.to_str().unwrap_or_default().to_string());

    let identity = match auth_header {
        None => Identity::Anonymous,
        Some(value) => {
            let token = value
                .strip_prefix("Bearer ")
                .ok_or_else(|| AppError::Auth("Invalid authorization header".to_string()))?;

            let username = state
                .jwt_service
                .extract_username(token)
                .map_err(|e| AppError::Auth(format!("Invalid token: {}", e)))?;

            // Check if user still exists
            let user_exists = sqlx::query("SELECT COUNT(*) as count FROM users WHERE username = ?")
                .bind(&username)
                .fetch_one(state.db.as_ref())
                .await
                .map_err(|_| AppError::Internal("Database error during auth check".to_string()))?
                .get::<i64, _>("count");

            if user_exists == 0 {
                return Err(AppError::Auth("User no longer exists".to_string()));
            }

            Identity::User(username)
        }
    };

    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Identity>()
            .cloned()
            .unwrap_or(Identity::Anonymous))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Identity>() {
            Some(Identity::User(username)) => Ok(AuthUser(username.clone())),
            _ => Err(AppError::Auth(
                "Authentication credentials were not provided.".to_string(),
            )),
        }
    }
}
