//! # nova-ocr
//!
//! Run OCR and captioning over a list of local images with Amazon Nova on
//! Bedrock, using a fixed pool of workers for a fixed wall-clock duration.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image list
//!  │
//!  ├─ 1. Input    read the newline-delimited list once
//!  ├─ 2. Pool     N workers claim images round-robin until the deadline
//!  ├─ 3. Encode   image bytes → base64 + detected format
//!  ├─ 4. Invoke   Bedrock InvokeModel with the inference profile ARN
//!  ├─ 5. Output   <stem>_<millis>.txt + <stem>_<millis>.json
//!  └─ 6. Errors   one line per failure in the error log, then continue
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nova_ocr::{run, RunConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credentials come from AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY / AWS_SESSION_TOKEN
//!     let config = RunConfig::builder("arn:aws:bedrock:us-west-2:123456789012:inference-profile/us.amazon.nova-lite-v1:0")
//!         .duration(Duration::from_secs(60))
//!         .threads(4)
//!         .build()?;
//!     let summary = run("images.txt", &config).await?;
//!     eprintln!("{} ok / {} failed", summary.succeeded, summary.failed);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `nova-ocr` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod run;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{InferenceParams, RunConfig, RunConfigBuilder};
pub use error::{NovaOcrError, TaskError};
pub use pipeline::invoke::{BedrockClient, InferenceClient};
pub use progress::{NoopProgressCallback, ProgressCallback, RunProgressCallback};
pub use run::{run, RunSummary, TaskCursor};
