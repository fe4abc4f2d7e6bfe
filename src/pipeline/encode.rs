//! Image encoding: file bytes → base64 plus the format name Nova expects.
//!
//! The bytes are sent as-is; no decoding or re-encoding happens. The format
//! is sniffed from magic bytes first because screenshot tools are careless
//! about extensions, then from the extension, and finally defaults to jpeg.

use crate::error::TaskError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;
use std::path::Path;
use tracing::debug;

/// An image ready to embed in a Nova request.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    /// Nova image format: `png`, `jpeg`, `gif` or `webp`.
    pub format: &'static str,
    /// Standard base64 of the original file bytes.
    pub data: String,
}

impl EncodedImage {
    /// MIME type matching [`Self::format`].
    pub fn mime_type(&self) -> String {
        format!("image/{}", self.format)
    }
}

/// Read the image at `path` and base64-encode it.
pub async fn encode_image(path: &Path) -> Result<EncodedImage, TaskError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| TaskError::ImageRead {
            path: path.to_path_buf(),
            source: e,
        })?;

    let format = detect_format(path, &bytes);
    let data = STANDARD.encode(&bytes);
    debug!(
        "Encoded {} ({}) → {} bytes base64",
        path.display(),
        format,
        data.len()
    );

    Ok(EncodedImage { format, data })
}

/// Pick the Nova format name for an image.
pub fn detect_format(path: &Path, bytes: &[u8]) -> &'static str {
    let format = image::guess_format(bytes)
        .ok()
        .or_else(|| ImageFormat::from_path(path).ok());

    match format {
        Some(ImageFormat::Png) => "png",
        Some(ImageFormat::Gif) => "gif",
        Some(ImageFormat::WebP) => "webp",
        _ => "jpeg",
    }
}
