use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A server as stored, joined with its category and owner.
///
/// `num_members` is only populated when the row came from a view that was
/// annotated with member counts.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ServerRow {
    pub id: i64,
    pub name: String,
    pub owner: String,
    pub category: String,
    pub icon: Option<String>,
    pub banner: Option<String>,
    pub description: Option<String>,
    #[sqlx(default)]
    pub num_members: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewServer {
    pub name: String,
    pub owner_username: String,
    pub category_id: i64,
    pub description: Option<String>,
    pub created_at: String,
}

impl NewServer {
    pub fn new(
        name: String,
        owner_username: String,
        category_id: i64,
        description: Option<String>,
    ) -> Self {
        Self {
            name,
            owner_username,
            category_id,
            description,
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerResponse {
    pub id: i64,
    pub name: String,
    pub owner: String,
    pub category: String,
    pub icon: Option<String>,
    pub banner: Option<String>,
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_members: Option<i64>,
}

impl ServerResponse {
    pub fn from_row(row: ServerRow, show_member_count: bool, media_url: &str) -> Self {
        Self {
            id: row.id,
            name: row.name,
            owner: row.owner,
            category: row.category,
            icon: row.icon.map(|path| media_file_url(media_url, &path)),
            banner: row.banner.map(|path| media_file_url(media_url, &path)),
            description: row.description,
            num_members: if show_member_count {
                Some(row.num_members.unwrap_or_default())
            } else {
                None
            },
        }
    }
}

pub fn serialize_servers(
    rows: Vec<ServerRow>,
    show_member_count: bool,
    media_url: &str,
) -> Vec<ServerResponse> {
    rows.into_iter()
        .map(|row| ServerResponse::from_row(row, show_member_count, media_url))
        .collect()
}

pub fn media_file_url(media_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        media_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Stored image slots on a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerAsset {
    Icon,
    Banner,
}

impl ServerAsset {
    pub fn column(&self) -> &'static str {
        match self {
            ServerAsset::Icon => "icon",
            ServerAsset::Banner => "banner",
        }
    }

    pub fn upload_dir(&self) -> &'static str {
        match self {
            ServerAsset::Icon => "server/icons",
            ServerAsset::Banner => "server/banners",
        }
    }
}
