//! CLI binary for nova-ocr.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `RunConfig` and prints a run summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use nova_ocr::{run, ProgressCallback, RunConfig, RunProgressCallback, RunSummary};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a bar that fills with elapsed time against
/// the run duration, plus one line per finished task.
struct CliProgressCallback {
    bar: ProgressBar,
    ok: AtomicUsize,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new(duration: Duration) -> Arc<Self> {
        let bar = ProgressBar::new(duration.as_secs().max(1));
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Processing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            ok: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
        })
    }

    fn refresh(&self) {
        let elapsed = self.bar.elapsed().as_secs();
        self.bar.set_position(elapsed.min(self.bar.length().unwrap_or(elapsed)));
        self.bar.set_message(format!(
            "{} ok  {} failed",
            self.ok.load(Ordering::SeqCst),
            self.errors.load(Ordering::SeqCst)
        ));
    }
}

impl RunProgressCallback for CliProgressCallback {
    fn on_run_start(&self, images: usize, workers: usize, duration: Duration) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!(
                "{images} images, {workers} workers, {}s",
                duration.as_secs()
            ))
        ));
        self.bar.reset_elapsed();
        self.refresh();
    }

    fn on_task_start(&self, _worker: usize, _image: &str) {
        self.refresh();
    }

    fn on_task_complete(&self, worker: usize, image: &str, text_len: usize) {
        self.ok.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} [{worker}] {}  {}",
            green("✓"),
            image,
            dim(&format!("{text_len:>5} chars")),
        ));
        self.refresh();
    }

    fn on_task_error(&self, worker: usize, image: &str, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar
            .println(format!("  {} [{worker}] {}  {}", red("✗"), image, red(&msg)));
        self.refresh();
    }

    fn on_run_complete(&self, _summary: &RunSummary) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Five minutes over a list, two workers (defaults)
  nova-ocr -i images.txt -p arn:aws:bedrock:us-west-2:123456789012:inference-profile/us.amazon.nova-lite-v1:0

  # One pass only, eight workers, custom output dir
  nova-ocr -i images.txt -p $PROFILE_ARN -t 8 --single-pass -o ./ocr

  # Custom prompt
  nova-ocr -i images.txt -p $PROFILE_ARN --prompt-file prompt.txt

OUTPUT:
  For every processed image two files are written to the output directory:
    <name>_<unix-millis>.txt    generated text
    <name>_<unix-millis>.json   full model response
  Failures are appended to the log file, one line each; the run continues.

ENVIRONMENT VARIABLES:
  AWS_ACCESS_KEY_ID       AWS access key (read by the AWS SDK)
  AWS_SECRET_ACCESS_KEY   AWS secret key (read by the AWS SDK)
  AWS_SESSION_TOKEN       AWS session token (read by the AWS SDK)
  RUST_LOG                Override the tracing filter (e.g. nova_ocr=debug)
"#;

/// Run OCR + captioning over a list of images with Amazon Nova on Bedrock.
#[derive(Parser, Debug)]
#[command(
    name = "nova-ocr",
    version,
    about = "Run OCR + captioning over a list of images with Amazon Nova on Bedrock",
    long_about = "Reads a newline-delimited list of image paths and sends each image to an \
Amazon Nova inference profile on Bedrock with a fixed number of concurrent workers. \
Runs for a fixed duration, cycling through the list, and writes the generated text and \
raw response for every image.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// File containing one image path per line.
    #[arg(short, long, env = "NOVA_OCR_IMAGE_LIST")]
    image_list: PathBuf,

    /// Output directory.
    #[arg(short, long, env = "NOVA_OCR_OUTPUT_DIR", default_value = "./output")]
    output_dir: PathBuf,

    /// AWS region.
    #[arg(short, long, env = "NOVA_OCR_REGION", default_value = "us-west-2")]
    region: String,

    /// Duration to run in seconds.
    #[arg(short, long, env = "NOVA_OCR_DURATION", default_value_t = 300,
          value_parser = clap::value_parser!(u64).range(1..))]
    duration: u64,

    /// Number of concurrent workers.
    #[arg(short, long, env = "NOVA_OCR_THREADS", default_value_t = 2,
          value_parser = clap::value_parser!(u64).range(1..))]
    threads: u64,

    /// Error log file path.
    #[arg(short, long, env = "NOVA_OCR_LOG_FILE", default_value = "./nova_lite_errors.log")]
    log_file: PathBuf,

    /// Inference profile ARN.
    #[arg(short, long, env = "NOVA_OCR_PROFILE_ARN")]
    profile_arn: String,

    /// Path to a text file containing a custom prompt.
    #[arg(long, env = "NOVA_OCR_PROMPT_FILE")]
    prompt_file: Option<PathBuf>,

    /// Max output tokens per image.
    #[arg(long, env = "NOVA_OCR_MAX_TOKENS", default_value_t = 3000)]
    max_tokens: u32,

    /// Sampling temperature (0.0–1.0).
    #[arg(long, env = "NOVA_OCR_TEMPERATURE", default_value_t = 0.3)]
    temperature: f64,

    /// Nucleus sampling mass (0.0–1.0).
    #[arg(long, env = "NOVA_OCR_TOP_P", default_value_t = 0.1)]
    top_p: f64,

    /// Top-k sampling cut-off.
    #[arg(long, env = "NOVA_OCR_TOP_K", default_value_t = 20)]
    top_k: u32,

    /// Stop after every image was claimed once instead of cycling until the deadline.
    #[arg(long, env = "NOVA_OCR_SINGLE_PASS")]
    single_pass: bool,

    /// Disable progress bar.
    #[arg(long, env = "NOVA_OCR_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "NOVA_OCR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "NOVA_OCR_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar already prints one line per image.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new(Duration::from_secs(cli.duration));
        Some(cb as Arc<dyn RunProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Run ──────────────────────────────────────────────────────────────
    let summary = run(&cli.image_list, &config).await.context("Run failed")?;

    if !cli.quiet {
        eprintln!(
            "{}  {} ok / {} failed  ({} tasks, {} workers, {} pass{})  {}ms  →  {}",
            if summary.failed == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            summary.succeeded,
            summary.failed,
            summary.tasks_claimed(),
            summary.workers,
            summary.passes_started,
            if summary.passes_started == 1 { "" } else { "es" },
            summary.elapsed_ms,
            bold(&config.output_dir.display().to_string()),
        );
        if summary.failed > 0 {
            eprintln!(
                "   {} see {}",
                dim("errors:"),
                config.log_file.display()
            );
        }
    }

    Ok(())
}

/// Map CLI args to `RunConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<RunConfig> {
    let mut builder = RunConfig::builder(cli.profile_arn.clone())
        .region(cli.region.clone())
        .output_dir(cli.output_dir.clone())
        .log_file(cli.log_file.clone())
        .duration(Duration::from_secs(cli.duration))
        .threads(cli.threads as usize)
        .wrap_around(!cli.single_pass)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .top_p(cli.top_p)
        .top_k(cli.top_k);

    if let Some(ref path) = cli.prompt_file {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {:?}", path))?;
        builder = builder.prompt(prompt);
    }

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn short_flags_and_defaults() {
        let cli = Cli::try_parse_from(["nova-ocr", "-i", "list.txt", "-p", "arn:x"]).unwrap();
        assert_eq!(cli.image_list, PathBuf::from("list.txt"));
        assert_eq!(cli.output_dir, PathBuf::from("./output"));
        assert_eq!(cli.region, "us-west-2");
        assert_eq!(cli.duration, 300);
        assert_eq!(cli.threads, 2);
        assert_eq!(cli.log_file, PathBuf::from("./nova_lite_errors.log"));
        assert!(!cli.single_pass);
    }

    #[test]
    fn profile_arn_is_required() {
        assert!(Cli::try_parse_from(["nova-ocr", "-i", "list.txt"]).is_err());
    }

    #[test]
    fn zero_threads_is_rejected() {
        assert!(Cli::try_parse_from(["nova-ocr", "-i", "l", "-p", "a", "-t", "0"]).is_err());
    }
}
