//! Plain-text failure log shared by all workers.
//!
//! One line per failed task: `<ctime>: Error processing <image>: <error>`.
//! Writes after startup are best-effort; a failure to append is reported
//! through `tracing` and otherwise ignored so it can never take a worker down.

use crate::error::NovaOcrError;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

/// Credential variables whose presence (never value) is recorded at startup.
const CREDENTIAL_VARS: [&str; 3] = [
    "AWS_ACCESS_KEY_ID",
    "AWS_SECRET_ACCESS_KEY",
    "AWS_SESSION_TOKEN",
];

/// Append-only error log.
#[derive(Debug)]
pub struct ErrorLog {
    path: PathBuf,
    file: Mutex<tokio::fs::File>,
}

impl ErrorLog {
    /// Open (creating if needed) the log at `path` in append mode and write
    /// the run header. This is the only fallible step.
    pub async fn open(path: &Path, region: &str) -> Result<Self, NovaOcrError> {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| NovaOcrError::LogFileFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        let log = Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        };

        let mut header = vec![
            "Starting nova-lite image processing".to_string(),
            format!("Using region: {region}"),
        ];
        header.extend(
            CREDENTIAL_VARS
                .iter()
                .map(|var| format!("{var} present: {}", std::env::var_os(var).is_some())),
        );
        for line in header {
            log.write_line(&line).await.map_err(|e| NovaOcrError::LogFileFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        Ok(log)
    }

    /// Record a failed task. Never fails.
    pub async fn record(&self, image: &str, error: &(dyn Display + Sync)) {
        let line = format!("Error processing {image}: {error}");
        self.note(&line).await;
    }

    /// Record a free-form line (used for fatal startup errors). Never fails.
    pub async fn note(&self, message: &str) {
        if let Err(e) = self.write_line(message).await {
            debug!("Could not append to {}: {}", self.path.display(), e);
        }
    }

    async fn write_line(&self, message: &str) -> std::io::Result<()> {
        let line = format!("{}: {}\n", ctime_now(), message.replace('\n', " "));
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}

/// Current local time in C `ctime` layout, e.g. `Mon Oct 19 14:03:07 2026`.
fn ctime_now() -> String {
    chrono::Local::now().format("%a %b %e %H:%M:%S %Y").to_string()
}
