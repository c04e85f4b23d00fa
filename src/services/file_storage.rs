use crate::database::DbPool;
use crate::services::image_validation::file_extension;
use crate::utils::crypto::hash_file;
use crate::utils::error::{AppError, AppResult};
use sqlx::Row;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Writes `data` under `media_root/upload_dir` and returns the path relative
/// to the media root. Files are named by content hash, so uploading the same
/// bytes twice reuses the stored file.
pub async fn save_media_file(
    media_root: &Path,
    upload_dir: &str,
    original_name: &str,
    data: &[u8],
) -> AppResult<String> {
    tracing::info!(
        "Storing media file: {} ({} bytes) in {}",
        original_name,
        data.len(),
        upload_dir
    );

    let dir = media_root.join(upload_dir);
    fs::create_dir_all(&dir)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to create media directory: {}", e)))?;

    let file_hash = hash_file(data);
    let file_name = format!(
        "{}{}",
        &file_hash[..32],
        file_extension(original_name).to_lowercase()
    );
    let relative_path = format!("{}/{}", upload_dir, file_name);
    let file_path = dir.join(&file_name);

    if fs::try_exists(&file_path).await.unwrap_or(false) {
        tracing::info!("Media file deduplicated: {}", relative_path);
        return Ok(relative_path);
    }

    let mut file = fs::File::create(&file_path)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to create file: {}", e)))?;

    file.write_all(data)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to write file: {}", e)))?;

    file.flush()
        .await
        .map_err(|e| AppError::Internal(format!("Failed to write file: {}", e)))?;

    tracing::info!("Media file saved: {}", relative_path);

    Ok(relative_path)
}

/// Deletes a stored media file once no server refers to it as icon or banner.
pub async fn remove_media_file_if_unreferenced(
    pool: &DbPool,
    media_root: &Path,
    relative_path: &str,
) -> AppResult<()> {
    let references =
        sqlx::query("SELECT COUNT(*) as count FROM servers WHERE icon = ? OR banner = ?")
            .bind(relative_path)
            .bind(relative_path)
            .fetch_one(pool.as_ref())
            .await?
            .get::<i64, _>("count");

    if references > 0 {
        tracing::debug!(
            "Keeping media file {} ({} references)",
            relative_path,
            references
        );
        return Ok(());
    }

    let file_path = media_root.join(relative_path);
    match fs::remove_file(&file_path).await {
        Ok(_) => tracing::info!("Deleted media file: {}", relative_path),
        Err(e) => tracing::warn!("Failed to delete media file {:?}: {}", file_path, e),
    }

    Ok(())
}
