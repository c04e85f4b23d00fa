use crate::database::DbPool;
use crate::models::user::{User, UserResponse};
use crate::utils::crypto::{hash_password, verify_password};
use crate::utils::error::{AppError, AppResult};
use crate::utils::jwt::JwtService;
use crate::utils::validation::{validate_password, validate_username};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::Row;

#[derive(Debug, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

/// Creates an account and returns a token for it. The first account created
/// becomes a site admin.
pub async fn register_user(
    pool: &DbPool,
    credentials: Credentials,
    jwt_service: &JwtService,
) -> AppResult<AuthResponse> {
    validate_username(&credentials.username)?;
    validate_password(&credentials.password)?;

    let total_users = sqlx::query("SELECT COUNT(*) as count FROM users")
        .fetch_one(pool.as_ref())
        .await?
        .get::<i64, _>("count");

    let is_first_user = total_users == 0;

    let username_exists =
        sqlx::query("SELECT COUNT(*) as count FROM users WHERE LOWER(username) = LOWER(?)")
            .bind(&credentials.username)
            .fetch_one(pool.as_ref())
            .await?
            .get::<i64, _>("count");

    if username_exists > 0 {
        return Err(AppError::BadRequest("Username already exists".to_string()));
    }

    let password_hash = hash_password(&credentials.password)?;
    let user = User::new(credentials.username, password_hash, is_first_user);

    sqlx::query(
        "INSERT INTO users (username, password_hash, created_at, is_admin) VALUES (?, ?, ?, ?)",
    )
    .bind(&user.username)
    .bind(&user.password_hash)
    .bind(&user.created_at)
    .bind(user.is_admin)
    .execute(pool.as_ref())
    .await?;

    tracing::info!(
        "Registered user {} (admin: {})",
        user.username,
        is_first_user
    );

    let token = jwt_service.generate_token(&user.username)?;

    Ok(AuthResponse {
        user: user.into(),
        token,
    })
}

pub async fn login_user(
    pool: &DbPool,
    credentials: Credentials,
    jwt_service: &JwtService,
) -> AppResult<AuthResponse> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
        .bind(&credentials.username)
        .fetch_optional(pool.as_ref())
        .await?
        .ok_or_else(|| AppError::Auth("Invalid username or password".to_string()))?;

    if !verify_password(&credentials.password, &user.password_hash)? {
        tracing::debug!("Failed login for {}", credentials.username);
        return Err(AppError::Auth("Invalid username or password".to_string()));
    }

    sqlx::query("UPDATE users SET last_login = ? WHERE username = ?")
        .bind(Utc::now().to_rfc3339())
        .bind(&user.username)
        .execute(pool.as_ref())
        .await?;

    let token = jwt_service.generate_token(&user.username)?;

    Ok(AuthResponse {
        user: user.into(),
        token,
    })
}
