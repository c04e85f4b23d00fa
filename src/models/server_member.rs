use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ServerMember {
    pub server_id: i64,
    pub username: String,
    pub joined_at: String,
}

impl ServerMember {
    pub fn new(server_id: i64, username: String) -> Self {
        Self {
            server_id,
            username,
            joined_at: Utc::now().to_rfc3339(),
        }
    }
}
