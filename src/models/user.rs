use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub username: String,
    pub password_hash: String,
    pub created_at: String,
    pub last_login: Option<String>,
    pub is_admin: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub username: String,
    pub created_at: String,
    pub is_admin: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            created_at: user.created_at,
            is_admin: user.is_admin == 1,
        }
    }
}

impl User {
    pub fn new(username: String, password_hash: String, is_admin: bool) -> Self {
        Self {
            username,
            password_hash,
            created_at: Utc::now().to_rfc3339(),
            last_login: None,
            is_admin: if is_admin { 1 } else { 0 },
        }
    }
}
