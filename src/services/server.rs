use crate::database::DbPool;
use crate::models::server::{NewServer, ServerAsset, ServerRow};
use crate::models::server_member::ServerMember;
use crate::services::category::find_category_by_name;
use crate::services::file_storage::{remove_media_file_if_unreferenced, save_media_file};
use crate::services::image_validation::{
    validate_icon_image_size, validate_image_file_extension, validate_upload_size,
};
use crate::services::server_query::ServerQuery;
use crate::utils::error::{AppError, AppResult};
use crate::utils::permissions::{check_site_admin, require_server_owner, server_owner};
use crate::utils::validation::{validate_description, validate_server_name};
use sqlx::Row;
use std::path::Path;

pub async fn get_server(pool: &DbPool, server_id: i64) -> AppResult<ServerRow> {
    ServerQuery::all()
        .filter_id(server_id)
        .annotate_member_count()
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Server not found".to_string()))
}

pub async fn create_server(
    pool: &DbPool,
    owner_username: String,
    name: String,
    category_name: &str,
    description: Option<String>,
) -> AppResult<ServerRow> {
    validate_server_name(&name)?;
    if let Some(description) = &description {
        validate_description(description)?;
    }

    let category = find_category_by_name(pool, category_name)
        .await?
        .ok_or_else(|| {
            AppError::Validation(format!("Category '{}' does not exist", category_name))
        })?;

    let server = NewServer::new(name, owner_username, category.id, description);

    let mut tx = pool.begin().await?;

    let server_id = sqlx::query(
        "INSERT INTO servers (name, owner_username, category_id, description, created_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&server.name)
    .bind(&server.owner_username)
    .bind(server.category_id)
    .bind(&server.description)
    .bind(&server.created_at)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let member = ServerMember::new(server_id, server.owner_username.clone());

    sqlx::query("INSERT INTO server_members (server_id, username, joined_at) VALUES (?, ?, ?)")
        .bind(member.server_id)
        .bind(&member.username)
        .bind(&member.joined_at)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(
        "Server '{}' (id={}) created by {} in category '{}'",
        server.name,
        server_id,
        server.owner_username,
        category.name
    );

    get_server(pool, server_id).await
}

pub async fn join_server(pool: &DbPool, server_id: i64, username: String) -> AppResult<ServerRow> {
    server_owner(pool, server_id).await?;

    let member = ServerMember::new(server_id, username);

    let result = sqlx::query(
        "INSERT OR IGNORE INTO server_members (server_id, username, joined_at) VALUES (?, ?, ?)",
    )
    .bind(member.server_id)
    .bind(&member.username)
    .bind(&member.joined_at)
    .execute(pool.as_ref())
    .await?;

    if result.rows_affected() > 0 {
        tracing::info!("{} joined server {}", member.username, server_id);
    }

    get_server(pool, server_id).await
}

pub async fn leave_server(pool: &DbPool, server_id: i64, username: &str) -> AppResult<()> {
    let owner = server_owner(pool, server_id).await?;

    if owner == username {
        return Err(AppError::BadRequest(
            "The server owner cannot leave the server".to_string(),
        ));
    }

    let result = sqlx::query("DELETE FROM server_members WHERE server_id = ? AND username = ?")
        .bind(server_id)
        .bind(username)
        .execute(pool.as_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(
            "Not a member of this server".to_string(),
        ));
    }

    tracing::info!("{} left server {}", username, server_id);
    Ok(())
}

pub async fn delete_server(
    pool: &DbPool,
    media_root: &Path,
    server_id: i64,
    requester_username: &str,
) -> AppResult<()> {
    let owner = server_owner(pool, server_id).await?;

    if owner != requester_username && !check_site_admin(pool, requester_username).await? {
        return Err(AppError::Forbidden(
            "Only the server owner or a site admin can delete a server".to_string(),
        ));
    }

    let assets = sqlx::query("SELECT icon, banner FROM servers WHERE id = ?")
        .bind(server_id)
        .fetch_one(pool.as_ref())
        .await?;
    let icon: Option<String> = assets.get("icon");
    let banner: Option<String> = assets.get("banner");

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM server_members WHERE server_id = ?")
        .bind(server_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM servers WHERE id = ?")
        .bind(server_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    for path in icon.iter().chain(banner.iter()) {
        remove_media_file_if_unreferenced(pool, media_root, path).await?;
    }

    tracing::info!("Server {} deleted by {}", server_id, requester_username);
    Ok(())
}

/// Validates and stores a new icon or banner for the server, replacing the
/// previous one. Icons must also fit the icon size limit.
pub async fn set_server_asset(
    pool: &DbPool,
    media_root: &Path,
    server_id: i64,
    requester_username: &str,
    asset: ServerAsset,
    file_name: &str,
    data: &[u8],
) -> AppResult<ServerRow> {
    require_server_owner(pool, requester_username, server_id).await?;

    validate_image_file_extension(file_name)?;
    validate_upload_size(data)?;
    if asset == ServerAsset::Icon {
        validate_icon_image_size(Some(data))?;
    }

    let previous: Option<String> = sqlx::query(&format!(
        "SELECT {} AS path FROM servers WHERE id = ?",
        asset.column()
    ))
    .bind(server_id)
    .fetch_one(pool.as_ref())
    .await?
    .get("path");

    let path = save_media_file(media_root, asset.upload_dir(), file_name, data).await?;

    let updated = sqlx::query(&format!(
        "UPDATE servers SET {} = ? WHERE id = ?",
        asset.column()
    ))
    .bind(&path)
    .bind(server_id)
    .execute(pool.as_ref())
    .await;

    if let Err(e) = updated {
        tracing::error!("Failed to record {} for server {}: {}", asset.column(), server_id, e);
        remove_media_file_if_unreferenced(pool, media_root, &path).await?;
        return Err(e.into());
    }

    tracing::info!(
        "Server {} {} updated by {}: {}",
        server_id,
        asset.column(),
        requester_username,
        path
    );

    if let Some(previous) = previous
        && previous != path
    {
        remove_media_file_if_unreferenced(pool, media_root, &previous).await?;
    }

    get_server(pool, server_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::create_memory_pool;
    use image::{DynamicImage, ImageFormat, RgbaImage};
    use std::io::Cursor;

    async fn setup() -> DbPool {
        let pool = create_memory_pool().await.unwrap();
        for (username, is_admin) in [("alice", 0), ("bob", 0), ("root", 1)] {
            sqlx::query(
                "INSERT INTO users (username, password_hash, created_at, is_admin) VALUES (?, 'x', '2025-01-01T00:00:00Z', ?)",
            )
            .bind(username)
            .bind(is_admin)
            .execute(pool.as_ref())
            .await
            .unwrap();
        }
        sqlx::query("INSERT INTO categories (name) VALUES ('gaming')")
            .execute(pool.as_ref())
            .await
            .unwrap();
        pool
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(RgbaImage::new(width, height))
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[tokio::test]
    async fn owner_becomes_first_member() {
        let pool = setup().await;
        let server = create_server(&pool, "alice".into(), "Lobby".into(), "gaming", None)
            .await
            .unwrap();
        assert_eq!(server.owner, "alice");
        assert_eq!(server.category, "gaming");
        assert_eq!(server.num_members, Some(1));
    }

    #[tokio::test]
    async fn unknown_category_is_rejected() {
        let pool = setup().await;
        let err = create_server(&pool, "alice".into(), "Lobby".into(), "cooking", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn join_is_idempotent_and_leave_removes() {
        let pool = setup().await;
        let server = create_server(&pool, "alice".into(), "Lobby".into(), "gaming", None)
            .await
            .unwrap();

        join_server(&pool, server.id, "bob".into()).await.unwrap();
        let joined = join_server(&pool, server.id, "bob".into()).await.unwrap();
        assert_eq!(joined.num_members, Some(2));

        leave_server(&pool, server.id, "bob").await.unwrap();
        assert!(matches!(
            leave_server(&pool, server.id, "bob").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            leave_server(&pool, server.id, "alice").await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn only_owner_or_admin_deletes() {
        let pool = setup().await;
        let dir = tempfile::tempdir().unwrap();
        let server = create_server(&pool, "alice".into(), "Lobby".into(), "gaming", None)
            .await
            .unwrap();

        assert!(matches!(
            delete_server(&pool, dir.path(), server.id, "bob").await,
            Err(AppError::Forbidden(_))
        ));
        delete_server(&pool, dir.path(), server.id, "root")
            .await
            .unwrap();
        assert!(matches!(
            get_server(&pool, server.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn icon_upload_validates_and_replaces() {
        let pool = setup().await;
        let dir = tempfile::tempdir().unwrap();
        let server = create_server(&pool, "alice".into(), "Lobby".into(), "gaming", None)
            .await
            .unwrap();

        let too_big = set_server_asset(
            &pool,
            dir.path(),
            server.id,
            "alice",
            ServerAsset::Icon,
            "big.png",
            &png(100, 50),
        )
        .await
        .unwrap_err();
        assert!(matches!(too_big, AppError::Validation(_)));
        assert!(get_server(&pool, server.id).await.unwrap().icon.is_none());

        let first = set_server_asset(
            &pool,
            dir.path(),
            server.id,
            "alice",
            ServerAsset::Icon,
            "small.png",
            &png(32, 32),
        )
        .await
        .unwrap()
        .icon
        .unwrap();
        assert!(dir.path().join(&first).exists());

        let second = set_server_asset(
            &pool,
            dir.path(),
            server.id,
            "alice",
            ServerAsset::Icon,
            "other.png",
            &png(70, 70),
        )
        .await
        .unwrap()
        .icon
        .unwrap();
        assert_ne!(first, second);
        assert!(!dir.path().join(&first).exists());
    }

    #[tokio::test]
    async fn failed_update_removes_stored_file() {
        let pool = setup().await;
        let dir = tempfile::tempdir().unwrap();
        let server = create_server(&pool, "alice".into(), "Lobby".into(), "gaming", None)
            .await
            .unwrap();

        sqlx::query(
            "CREATE TRIGGER servers_icon_locked BEFORE UPDATE OF icon ON servers
             BEGIN SELECT RAISE(ABORT, 'icon locked'); END",
        )
        .execute(pool.as_ref())
        .await
        .unwrap();

        let err = set_server_asset(
            &pool,
            dir.path(),
            server.id,
            "alice",
            ServerAsset::Icon,
            "small.png",
            &png(16, 16),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Database(_)));

        let icons = dir.path().join(ServerAsset::Icon.upload_dir());
        let leftover = std::fs::read_dir(&icons)
            .map(|entries| entries.count())
            .unwrap_or(0);
        assert_eq!(leftover, 0);
        assert!(get_server(&pool, server.id).await.unwrap().icon.is_none());
    }

    #[tokio::test]
    async fn banner_skips_size_limit_but_checks_extension() {
        let pool = setup().await;
        let dir = tempfile::tempdir().unwrap();
        let server = create_server(&pool, "alice".into(), "Lobby".into(), "gaming", None)
            .await
            .unwrap();

        let banner = set_server_asset(
            &pool,
            dir.path(),
            server.id,
            "alice",
            ServerAsset::Banner,
            "wide.PNG",
            &png(400, 100),
        )
        .await
        .unwrap();
        assert!(banner.banner.is_some());

        let err = set_server_asset(
            &pool,
            dir.path(),
            server.id,
            "alice",
            ServerAsset::Banner,
            "wide.bmp",
            &png(400, 100),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref msg) if msg.contains(".bmp")));
    }

    #[tokio::test]
    async fn non_owner_cannot_upload() {
        let pool = setup().await;
        let dir = tempfile::tempdir().unwrap();
        let server = create_server(&pool, "alice".into(), "Lobby".into(), "gaming", None)
            .await
            .unwrap();

        let err = set_server_asset(
            &pool,
            dir.path(),
            server.id,
            "bob",
            ServerAsset::Icon,
            "icon.png",
            &png(10, 10),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
