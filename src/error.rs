//! Error types for the nova-ocr library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`NovaOcrError`] is **fatal**: the run cannot start at all (image list
//!   missing or empty, output directory or log file cannot be created, bad
//!   configuration). Returned as `Err(NovaOcrError)` from [`crate::run::run`].
//!
//! * [`TaskError`] is **non-fatal**: a single image failed (unreadable file,
//!   Bedrock error, malformed response, output write failure). Workers hand
//!   it to the error log and move on to the next image.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the nova-ocr library.
#[derive(Debug, Error)]
pub enum NovaOcrError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The image list file does not exist.
    #[error("Image list not found: '{path}'\nCheck the path exists and is readable.")]
    ImageListNotFound { path: PathBuf },

    /// The image list exists but could not be read.
    #[error("Failed to read image list '{path}': {source}")]
    ImageListUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The image list contains no non-blank lines.
    #[error("Image list '{path}' contains no image paths")]
    EmptyImageList { path: PathBuf },

    // ── Startup I/O errors ────────────────────────────────────────────────
    /// Could not create the output directory, or it is not writable.
    #[error("Cannot create or write to output directory '{path}': {source}")]
    OutputDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or open the error log file.
    #[error("Failed to open log file '{path}': {source}")]
    LogFileFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (e.g. a worker task panicked).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single image.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The image file could not be read.
    #[error("failed to read image '{path}': {source}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The request body could not be serialised.
    #[error("failed to build model request: {detail}")]
    Request { detail: String },

    /// The Bedrock call failed (network, throttling, auth, validation, ...).
    #[error("model invocation failed: {detail}")]
    Invoke { detail: String },

    /// The response body was not valid JSON.
    #[error("invalid model response: {detail}")]
    InvalidResponse { detail: String },

    /// The response JSON had no generated text at the expected location.
    #[error("model response has no text at '{pointer}'")]
    MissingText { pointer: &'static str },

    /// One of the output files could not be written.
    #[error("failed to write output file '{path}': {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
