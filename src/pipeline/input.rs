//! Input resolution: load the newline-delimited image list.
//!
//! Paths are not checked here. A path that does not exist surfaces later as
//! a per-task [`crate::error::TaskError::ImageRead`], so one bad line never
//! aborts the run.

use crate::error::NovaOcrError;
use std::path::Path;
use tracing::debug;

/// Read the image list at `path` into an ordered list of trimmed,
/// non-blank lines.
///
/// Duplicates are kept; each occurrence is a separate task.
pub async fn read_image_list(path: &Path) -> Result<Vec<String>, NovaOcrError> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            NovaOcrError::ImageListNotFound {
                path: path.to_path_buf(),
            }
        } else {
            NovaOcrError::ImageListUnreadable {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;

    let images = parse_image_list(&contents);
    if images.is_empty() {
        return Err(NovaOcrError::EmptyImageList {
            path: path.to_path_buf(),
        });
    }

    debug!("Loaded {} image paths from {}", images.len(), path.display());
    Ok(images)
}

/// Split list contents into trimmed, non-blank lines.
pub fn parse_image_list(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}
