use crate::{database::DbPool, utils::error::AppError};
use sqlx::Row;

pub async fn check_site_admin(pool: &DbPool, username: &str) -> Result<bool, AppError> {
    let is_admin = sqlx::query("SELECT is_admin FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool.as_ref())
        .await?
        .map(|row| row.get::<i64, _>("is_admin"))
        .unwrap_or(0);

    Ok(is_admin == 1)
}

/// Owner of the server, or `NotFound` when it does not exist.
pub async fn server_owner(pool: &DbPool, server_id: i64) -> Result<String, AppError> {
    sqlx::query("SELECT owner_username FROM servers WHERE id = ?")
        .bind(server_id)
        .fetch_optional(pool.as_ref())
        .await?
        .map(|row| row.get::<String, _>("owner_username"))
        .ok_or_else(|| AppError::NotFound("Server not found".to_string()))
}

pub async fn require_server_owner(
    pool: &DbPool,
    username: &str,
    server_id: i64,
) -> Result<(), AppError> {
    let owner = server_owner(pool, server_id).await?;
    if owner != username {
        return Err(AppError::Forbidden(
            "Only the server owner can do this".to_string(),
        ));
    }
    Ok(())
}

pub async fn require_site_admin(pool: &DbPool, username: &str) -> Result<(), AppError> {
    if !check_site_admin(pool, username).await? {
        return Err(AppError::Forbidden(
            "Site admin privileges required".to_string(),
        ));
    }
    Ok(())
}
