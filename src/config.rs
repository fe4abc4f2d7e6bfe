//! Configuration types for a timed OCR run.
//!
//! All run behaviour is controlled through [`RunConfig`], built via its
//! [`RunConfigBuilder`]. One struct holds every knob so it can be cloned
//! into each worker and logged as a whole.

use crate::error::NovaOcrError;
use crate::pipeline::invoke::InferenceClient;
use crate::progress::ProgressCallback;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for one run over an image list.
///
/// Built via [`RunConfig::builder()`]. There is no `Default` impl because the
/// inference profile has no sensible default.
///
/// # Example
/// ```rust
/// use nova_ocr::RunConfig;
/// use std::time::Duration;
///
/// let config = RunConfig::builder("arn:aws:bedrock:us-west-2:123456789012:inference-profile/us.amazon.nova-lite-v1:0")
///     .threads(4)
///     .duration(Duration::from_secs(60))
///     .build()
///     .unwrap();
/// assert_eq!(config.threads, 4);
/// ```
#[derive(Clone)]
pub struct RunConfig {
    /// Inference profile ARN (or model id) passed as `modelId` to Bedrock.
    pub profile_arn: String,

    /// AWS region for the Bedrock runtime client. Default: `us-west-2`.
    pub region: String,

    /// Directory receiving the `.txt` / `.json` pair per image. Default: `./output`.
    pub output_dir: PathBuf,

    /// Plain-text failure log. Default: `./nova_lite_errors.log`.
    pub log_file: PathBuf,

    /// Wall-clock budget. No task is claimed after it elapses. Default: 300 s.
    pub duration: Duration,

    /// Number of concurrent workers. Default: 2.
    pub threads: usize,

    /// Revisit the list from the start once every image has been claimed.
    /// Default: true. With `false` the run ends after one pass.
    pub wrap_around: bool,

    /// Custom prompt. If None, uses [`crate::prompts::DEFAULT_PROMPT`].
    pub prompt: Option<String>,

    /// Sampling parameters sent in `inferenceConfig`.
    pub inference: InferenceParams,

    /// Pre-constructed inference client. Takes precedence over the Bedrock
    /// client built from `region`.
    pub client: Option<Arc<dyn InferenceClient>>,

    /// Receives run and per-task events.
    pub progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("profile_arn", &self.profile_arn)
            .field("region", &self.region)
            .field("output_dir", &self.output_dir)
            .field("log_file", &self.log_file)
            .field("duration", &self.duration)
            .field("threads", &self.threads)
            .field("wrap_around", &self.wrap_around)
            .field("prompt", &self.prompt.as_ref().map(|p| p.len()))
            .field("inference", &self.inference)
            .field("client", &self.client.as_ref().map(|_| "<dyn InferenceClient>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn RunProgressCallback>"),
            )
            .finish()
    }
}

impl RunConfig {
    /// Create a new builder with every field at its default.
    pub fn builder(profile_arn: impl Into<String>) -> RunConfigBuilder {
        RunConfigBuilder {
            config: Self {
                profile_arn: profile_arn.into(),
                region: "us-west-2".to_string(),
                output_dir: PathBuf::from("./output"),
                log_file: PathBuf::from("./nova_lite_errors.log"),
                duration: Duration::from_secs(300),
                threads: 2,
                wrap_around: true,
                prompt: None,
                inference: InferenceParams::default(),
                client: None,
                progress_callback: None,
            },
        }
    }
}

/// Builder for [`RunConfig`].
#[derive(Debug)]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.config.region = region.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.log_file = path.into();
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.config.duration = duration;
        self
    }

    pub fn threads(mut self, n: usize) -> Self {
        self.config.threads = n.max(1);
        self
    }

    pub fn wrap_around(mut self, v: bool) -> Self {
        self.config.wrap_around = v;
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.inference.max_tokens = n;
        self
    }

    pub fn temperature(mut self, t: f64) -> Self {
        self.config.inference.temperature = t.clamp(0.0, 1.0);
        self
    }

    pub fn top_p(mut self, p: f64) -> Self {
        self.config.inference.top_p = p.clamp(0.0, 1.0);
        self
    }

    pub fn top_k(mut self, k: u32) -> Self {
        self.config.inference.top_k = k;
        self
    }

    pub fn client(mut self, client: Arc<dyn InferenceClient>) -> Self {
        self.config.client = Some(client);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RunConfig, NovaOcrError> {
        let c = &self.config;
        if c.profile_arn.trim().is_empty() {
            return Err(NovaOcrError::InvalidConfig(
                "inference profile ARN must not be empty".into(),
            ));
        }
        if c.threads == 0 {
            return Err(NovaOcrError::InvalidConfig("threads must be ≥ 1".into()));
        }
        if c.duration.is_zero() {
            return Err(NovaOcrError::InvalidConfig(
                "duration must be greater than zero".into(),
            ));
        }
        if c.inference.max_tokens == 0 {
            return Err(NovaOcrError::InvalidConfig("max tokens must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

/// Sampling parameters for Nova's `inferenceConfig` block.
///
/// Low temperature and top-p keep the transcription faithful to the pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceParams {
    /// Upper bound on generated tokens. Default: 3000.
    pub max_tokens: u32,
    /// Nucleus sampling mass. Default: 0.1.
    pub top_p: f64,
    /// Top-k sampling cut-off. Default: 20.
    pub top_k: u32,
    /// Sampling temperature. Default: 0.3.
    pub temperature: f64,
}

impl Default for InferenceParams {
    fn default() -> Self {
        Self {
            max_tokens: 3000,
            top_p: 0.1,
            top_k: 20,
            temperature: 0.3,
        }
    }
}
