use std::io::Cursor;
use std::path::Path;

use image::{ImageError, ImageReader};
use thiserror::Error;

use crate::utils::error::{AppError, AppResult};

pub const MAX_ICON_DIMENSION: u32 = 70;

const MAX_UPLOAD_SIZE: usize = 5 * 1024 * 1024;

const VALID_EXTENSIONS: &[&str] = &[".jpeg", ".jpg", ".png", ".gif"];

#[derive(Error, Debug)]
pub enum ImageValidationError {
    #[error(
        "The maximum allowed dimensions for the image are {max} X {max} - size of the image you uploaded: ({width}, {height})",
        max = MAX_ICON_DIMENSION
    )]
    TooLarge { width: u32, height: u32 },

    #[error("Upload a valid image. The file you uploaded was either not an image or a corrupted image.")]
    Undecodable(#[source] ImageError),

    #[error("The {0} extension is not supported!")]
    UnsupportedExtension(String),
}

/// Rejects icons wider or taller than [`MAX_ICON_DIMENSION`] pixels.
///
/// A missing or empty image passes. Only the header is decoded to read the
/// dimensions.
pub fn validate_icon_image_size(image: Option<&[u8]>) -> Result<(), ImageValidationError> {
    let Some(data) = image.filter(|data| !data.is_empty()) else {
        return Ok(());
    };

    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ImageValidationError::Undecodable(ImageError::IoError(e)))?;

    let (width, height) = reader
        .into_dimensions()
        .map_err(ImageValidationError::Undecodable)?;

    if width > MAX_ICON_DIMENSION || height > MAX_ICON_DIMENSION {
        return Err(ImageValidationError::TooLarge { width, height });
    }

    Ok(())
}

/// Extension of the final path component including the leading dot, or an
/// empty string when there is none. Dotfiles such as `.hidden` have no extension.
pub fn file_extension(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

pub fn validate_image_file_extension(file_name: &str) -> Result<(), ImageValidationError> {
    let ext = file_extension(file_name);

    if !VALID_EXTENSIONS.contains(&ext.to_lowercase().as_str()) {
        return Err(ImageValidationError::UnsupportedExtension(ext));
    }

    Ok(())
}

pub fn validate_upload_size(data: &[u8]) -> AppResult<()> {
    if data.is_empty() {
        return Err(AppError::Validation("File is empty".to_string()));
    }

    if data.len() > MAX_UPLOAD_SIZE {
        return Err(AppError::Validation(format!(
            "File too large: {} bytes (max {} bytes)",
            data.len(),
            MAX_UPLOAD_SIZE
        )));
    }

    Ok(())
}
