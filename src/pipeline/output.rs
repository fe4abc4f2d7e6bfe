//! Output writing: one `.txt` and one `.json` per successful task.
//!
//! Both files share a base name `<stem>_<unix-millis>`. The `.json` path is
//! claimed first with `create_new`, so two workers finishing the same image
//! in the same millisecond get distinct names (`_1`, `_2`, ...) instead of
//! overwriting each other. A failure after the `.json` is written leaves it
//! in place.

use crate::error::TaskError;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Paths written for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub text: PathBuf,
    pub json: PathBuf,
}

/// Base name used when the image path has no file stem (e.g. `/`).
const FALLBACK_STEM: &str = "image";

/// Upper bound on collision suffixes tried before giving up.
const MAX_COLLISIONS: u32 = 1000;

/// Name of the throwaway file used to check the output directory at startup.
const WRITE_CHECK_NAME: &str = ".nova-ocr-write-check";

/// Create `output_dir` if needed and confirm a file can be created in it.
///
/// `create_dir_all` succeeds on an existing read-only directory, so a file is
/// created and removed again to catch that case before any worker starts.
pub async fn prepare_output_dir(output_dir: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(output_dir).await?;

    let check = output_dir.join(format!("{WRITE_CHECK_NAME}-{}", std::process::id()));
    tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&check)
        .await?;
    tokio::fs::remove_file(&check).await
}

/// File stem of an image reference.
pub fn image_stem(image: &Path) -> String {
    image
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| FALLBACK_STEM.to_string())
}

/// Write `text` and the pretty-printed `raw` response for `image` into `output_dir`.
pub async fn write_outputs(
    output_dir: &Path,
    image: &Path,
    text: &str,
    raw: &Value,
) -> Result<OutputPaths, TaskError> {
    let base = format!("{}_{}", image_stem(image), chrono::Utc::now().timestamp_millis());
    write_pair(output_dir, &base, text, raw).await
}

/// Write the `.json` then the `.txt` under `base`. A failed text write
/// leaves the `.json` behind.
async fn write_pair(
    output_dir: &Path,
    base: &str,
    text: &str,
    raw: &Value,
) -> Result<OutputPaths, TaskError> {
    let json_bytes = serde_json::to_vec_pretty(raw).map_err(|e| TaskError::InvalidResponse {
        detail: e.to_string(),
    })?;

    let (mut json_file, paths) = claim_paths(output_dir, base).await?;
    json_file
        .write_all(&json_bytes)
        .await
        .map_err(|e| TaskError::OutputWrite {
            path: paths.json.clone(),
            source: e,
        })?;
    json_file.flush().await.map_err(|e| TaskError::OutputWrite {
        path: paths.json.clone(),
        source: e,
    })?;

    tokio::fs::write(&paths.text, text)
        .await
        .map_err(|e| TaskError::OutputWrite {
            path: paths.text.clone(),
            source: e,
        })?;

    debug!("Wrote {} and {}", paths.text.display(), paths.json.display());
    Ok(paths)
}

/// Create the `.json` file exclusively, bumping a numeric suffix on collision.
async fn claim_paths(
    output_dir: &Path,
    base: &str,
) -> Result<(tokio::fs::File, OutputPaths), TaskError> {
    let mut attempt = 0u32;
    loop {
        let name = if attempt == 0 {
            base.to_string()
        } else {
            format!("{base}_{attempt}")
        };
        let json = output_dir.join(format!("{name}.json"));
        let text = output_dir.join(format!("{name}.txt"));

        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&json)
            .await
        {
            Ok(file) => return Ok((file, OutputPaths { text, json })),
            Err(e) if e.kind() == ErrorKind::AlreadyExists && attempt < MAX_COLLISIONS => {
                attempt += 1;
            }
            Err(e) => return Err(TaskError::OutputWrite { path: json, source: e }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stem_drops_directory_and_extension() {
        assert_eq!(image_stem(Path::new("/shots/meeting 01.png")), "meeting 01");
        assert_eq!(image_stem(Path::new("archive.tar.gz")), "archive.tar");
        assert_eq!(image_stem(Path::new("/")), "image");
    }

    #[tokio::test]
    async fn writes_text_and_json_pair() {
        let dir = tempfile::tempdir().unwrap();
        let raw = json!({"output": {"message": {"content": [{"text": "hello"}]}}});

        let paths = write_outputs(dir.path(), Path::new("/in/shot.png"), "hello", &raw)
            .await
            .unwrap();

        assert_eq!(paths.text.file_stem(), paths.json.file_stem());
        assert_eq!(paths.text.extension().unwrap(), "txt");
        assert_eq!(paths.json.extension().unwrap(), "json");
        assert!(paths
            .text
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("shot_"));

        assert_eq!(std::fs::read_to_string(&paths.text).unwrap(), "hello");
        let back: Value =
            serde_json::from_str(&std::fs::read_to_string(&paths.json).unwrap()).unwrap();
        assert_eq!(back, raw);
    }

    #[tokio::test]
    async fn collision_gets_numeric_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let (_f, first) = claim_paths(dir.path(), "shot_1700000000000").await.unwrap();
        let (_g, second) = claim_paths(dir.path(), "shot_1700000000000").await.unwrap();

        assert_ne!(first.json, second.json);
        assert_eq!(
            second.json.file_name().unwrap(),
            "shot_1700000000000_1.json"
        );
        assert_eq!(second.text.file_name().unwrap(), "shot_1700000000000_1.txt");
    }

    #[tokio::test]
    async fn failed_text_write_keeps_the_json() {
        let dir = tempfile::tempdir().unwrap();
        // A directory squatting on the .txt name makes the text write fail.
        std::fs::create_dir(dir.path().join("shot_42.txt")).unwrap();

        let err = write_pair(dir.path(), "shot_42", "hello", &json!({"ok": true}))
            .await
            .unwrap_err();

        match err {
            TaskError::OutputWrite { path, .. } => {
                assert_eq!(path, dir.path().join("shot_42.txt"))
            }
            other => panic!("unexpected error: {other}"),
        }
        let kept = std::fs::read_to_string(dir.path().join("shot_42.json")).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&kept).unwrap(), json!({"ok": true}));
    }

    #[tokio::test]
    async fn prepare_creates_nested_dir_and_leaves_it_empty() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("a/b/out");

        prepare_output_dir(&out).await.unwrap();

        assert!(out.is_dir());
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn prepare_rejects_a_file_in_place_of_the_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        std::fs::write(&out, "not a directory").unwrap();

        assert!(prepare_output_dir(&out).await.is_err());
    }

    #[tokio::test]
    async fn missing_output_dir_is_output_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("does/not/exist");
        let err = write_outputs(&gone, Path::new("a.png"), "t", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::OutputWrite { .. }));
    }
}
