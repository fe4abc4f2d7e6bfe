//! Timed run: a fixed pool of workers cycling over the image list.
//!
//! ## Shape of a run
//!
//! ```text
//! errlog::open ─▶ input::read_image_list ─▶ create output dir ─▶ spawn N workers
//!                                                                   │
//!        ┌──────────────────────────────────────────────────────────┘
//!        ▼
//!   loop { deadline passed? ─yes─▶ exit
//!          cursor.claim()   ─none─▶ exit   (single-pass only)
//!          encode ▶ invoke ▶ output  ──err──▶ errlog.record }
//! ```
//!
//! The only shared mutable state is the [`TaskCursor`]. The deadline is
//! fixed before the first worker starts and is only checked between tasks:
//! a call that is already in flight runs to completion. A duration too large
//! to represent as an instant means no deadline at all.

use crate::config::RunConfig;
use crate::error::{NovaOcrError, TaskError};
use crate::pipeline::errlog::ErrorLog;
use crate::pipeline::invoke::{BedrockClient, InferenceClient};
use crate::pipeline::output::OutputPaths;
use crate::pipeline::{encode, input, invoke, output, sections};
use crate::progress::ProgressCallback;
use crate::prompts::DEFAULT_PROMPT;
use futures::future::join_all;
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

// ── Task cursor ──────────────────────────────────────────────────────────

/// Shared index into the image list.
///
/// Each claim advances the index by one. With wraparound the index is taken
/// modulo the list length, so the list is revisited for as long as the run
/// lasts; without it, claims stop after the last image.
#[derive(Debug)]
pub struct TaskCursor {
    next: AtomicUsize,
    len: usize,
    wrap_around: bool,
}

/// One claimed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claim {
    /// Zero-based claim number across the whole pool.
    pub seq: usize,
    /// Index into the image list.
    pub index: usize,
}

impl Claim {
    /// Zero-based pass over the list this claim belongs to.
    pub fn pass(&self, len: usize) -> usize {
        self.seq / len.max(1)
    }
}

impl TaskCursor {
    pub fn new(len: usize, wrap_around: bool) -> Self {
        Self {
            next: AtomicUsize::new(0),
            len,
            wrap_around,
        }
    }

    /// Claim the next image, or `None` when the list is empty or a single
    /// pass has been exhausted.
    pub fn claim(&self) -> Option<Claim> {
        if self.len == 0 {
            return None;
        }
        let seq = self.next.fetch_add(1, Ordering::SeqCst);
        if !self.wrap_around && seq >= self.len {
            return None;
        }
        Some(Claim {
            seq,
            index: seq % self.len,
        })
    }
}

// ── Results ──────────────────────────────────────────────────────────────

/// What a successful task produced.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub paths: OutputPaths,
    pub text_len: usize,
}

/// Totals for a finished run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// Number of images in the list.
    pub images: usize,
    /// Workers spawned.
    pub workers: usize,
    /// Tasks claimed by each worker, indexed by worker id.
    pub tasks_per_worker: Vec<usize>,
    /// Tasks whose two output files were written.
    pub succeeded: usize,
    /// Tasks that were logged as failures.
    pub failed: usize,
    /// Passes over the list that at least one task started.
    pub passes_started: usize,
    /// Wall-clock time from pool start to the last worker exiting.
    pub elapsed_ms: u64,
}

impl RunSummary {
    /// Total tasks claimed across all workers.
    pub fn tasks_claimed(&self) -> usize {
        self.tasks_per_worker.iter().sum()
    }
}

// ── Shared context ───────────────────────────────────────────────────────

struct RunContext {
    images: Vec<String>,
    cursor: TaskCursor,
    deadline: Option<Instant>,
    client: Arc<dyn InferenceClient>,
    errlog: ErrorLog,
    config: RunConfig,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
}

impl RunContext {
    fn prompt(&self) -> &str {
        self.config.prompt.as_deref().unwrap_or(DEFAULT_PROMPT)
    }

    fn progress(&self) -> Option<&ProgressCallback> {
        self.config.progress_callback.as_ref()
    }

    fn before_deadline(&self) -> bool {
        self.deadline.map_or(true, |deadline| Instant::now() < deadline)
    }
}

// ── Entry points ─────────────────────────────────────────────────────────

/// Process the images listed in `image_list` until `config.duration` elapses.
///
/// # Errors
/// Returns `Err(NovaOcrError)` only for fatal startup errors: the log file
/// cannot be opened, the image list is missing, unreadable or empty, or the
/// output directory cannot be created or written to. Per-image failures are logged and
/// counted in [`RunSummary::failed`].
pub async fn run(
    image_list: impl AsRef<Path>,
    config: &RunConfig,
) -> Result<RunSummary, NovaOcrError> {
    let image_list = image_list.as_ref();

    // ── Step 1: Error log ────────────────────────────────────────────────
    let errlog = ErrorLog::open(&config.log_file, &config.region).await?;

    // ── Step 2: Image list ───────────────────────────────────────────────
    let images = match input::read_image_list(image_list).await {
        Ok(images) => images,
        Err(e) => {
            errlog.note(&e.to_string()).await;
            return Err(e);
        }
    };
    info!("Found {} images in {}", images.len(), image_list.display());

    // ── Step 3: Output directory ─────────────────────────────────────────
    if let Err(e) = output::prepare_output_dir(&config.output_dir).await {
        let err = NovaOcrError::OutputDirFailed {
            path: config.output_dir.clone(),
            source: e,
        };
        errlog.note(&err.to_string()).await;
        return Err(err);
    }

    // ── Step 4: Client ───────────────────────────────────────────────────
    let client = resolve_client(config).await;

    // ── Step 5: Worker pool ──────────────────────────────────────────────
    let workers = config.threads.max(1);
    if let Some(cb) = &config.progress_callback {
        cb.on_run_start(images.len(), workers, config.duration);
    }
    info!(
        "Starting {} workers for {}s (region {}, wraparound {})",
        workers,
        config.duration.as_secs_f64(),
        config.region,
        config.wrap_around
    );

    let start = Instant::now();
    let ctx = Arc::new(RunContext {
        cursor: TaskCursor::new(images.len(), config.wrap_around),
        images,
        deadline: start.checked_add(config.duration),
        client,
        errlog,
        config: config.clone(),
        succeeded: AtomicUsize::new(0),
        failed: AtomicUsize::new(0),
    });

    let handles = (0..workers).map(|id| tokio::spawn(worker_loop(id, Arc::clone(&ctx))));
    let mut tasks_per_worker = Vec::with_capacity(workers);
    let mut passes_started = 0;
    for joined in join_all(handles).await {
        let stats = joined.map_err(|e| NovaOcrError::Internal(format!("worker failed: {e}")))?;
        tasks_per_worker.push(stats.tasks);
        passes_started = passes_started.max(stats.max_pass.map_or(0, |p| p + 1));
    }

    let summary = RunSummary {
        images: ctx.images.len(),
        workers,
        tasks_per_worker,
        succeeded: ctx.succeeded.load(Ordering::SeqCst),
        failed: ctx.failed.load(Ordering::SeqCst),
        passes_started,
        elapsed_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
    };

    info!(
        "Processing completed after {}ms: {} succeeded, {} failed. Results saved in {}",
        summary.elapsed_ms,
        summary.succeeded,
        summary.failed,
        config.output_dir.display()
    );
    if let Some(cb) = ctx.progress() {
        cb.on_run_complete(&summary);
    }

    Ok(summary)
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Use the caller's client if one was configured, else Bedrock in `config.region`.
async fn resolve_client(config: &RunConfig) -> Arc<dyn InferenceClient> {
    if let Some(ref client) = config.client {
        return Arc::clone(client);
    }
    Arc::new(BedrockClient::from_region(&config.region).await)
}

struct WorkerStats {
    tasks: usize,
    max_pass: Option<usize>,
}

/// Claim and process images until the deadline passes or the cursor runs dry.
async fn worker_loop(worker: usize, ctx: Arc<RunContext>) -> WorkerStats {
    let mut stats = WorkerStats {
        tasks: 0,
        max_pass: None,
    };

    while ctx.before_deadline() {
        let Some(claim) = ctx.cursor.claim() else {
            debug!("Worker {}: image list exhausted", worker);
            break;
        };
        let image = ctx.images[claim.index].as_str();
        stats.tasks += 1;
        stats.max_pass = stats.max_pass.max(Some(claim.pass(ctx.images.len())));

        if let Some(cb) = ctx.progress() {
            cb.on_task_start(worker, image);
        }

        match process_task(&ctx, worker, image).await {
            Ok(outcome) => {
                ctx.succeeded.fetch_add(1, Ordering::SeqCst);
                info!("Response saved to: {}", outcome.paths.text.display());
                if let Some(cb) = ctx.progress() {
                    cb.on_task_complete(worker, image, outcome.text_len);
                }
            }
            Err(e) => {
                ctx.failed.fetch_add(1, Ordering::SeqCst);
                warn!("Worker {}: error processing {}: {}", worker, image, e);
                ctx.errlog.record(image, &e).await;
                if let Some(cb) = ctx.progress() {
                    cb.on_task_error(worker, image, &e.to_string());
                }
            }
        }
    }

    debug!("Worker {} exiting after {} tasks", worker, stats.tasks);
    stats
}

/// One task: encode the image, call the model, write both outputs.
async fn process_task(
    ctx: &RunContext,
    worker: usize,
    image: &str,
) -> Result<TaskOutcome, TaskError> {
    let path = Path::new(image);
    let encoded = encode::encode_image(path).await?;
    debug!(
        "Worker {}: processing {} ({})",
        worker,
        image,
        encoded.mime_type()
    );

    let response = invoke::infer(
        ctx.client.as_ref(),
        &ctx.config.profile_arn,
        &encoded,
        ctx.prompt(),
        ctx.config.inference,
    )
    .await?;

    let sections = sections::parse_sections(&response.text);
    if sections.is_empty() {
        warn!("Response for {} has no <ocr>/<caption> sections", image);
    } else {
        debug!(
            "Response for {}: {} OCR chars, caption {}",
            image,
            sections.ocr.as_deref().map_or(0, str::len),
            sections.short_caption.is_some()
        );
    }

    let paths =
        output::write_outputs(&ctx.config.output_dir, path, &response.text, &response.raw).await?;

    Ok(TaskOutcome {
        paths,
        text_len: response.text.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_wraps_round_robin() {
        let cursor = TaskCursor::new(3, true);
        let indices: Vec<usize> = (0..7).map(|_| cursor.claim().unwrap().index).collect();
        assert_eq!(indices, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn cursor_single_pass_stops_after_last_image() {
        let cursor = TaskCursor::new(2, false);
        assert_eq!(cursor.claim().map(|c| c.index), Some(0));
        assert_eq!(cursor.claim().map(|c| c.index), Some(1));
        assert_eq!(cursor.claim(), None);
        assert_eq!(cursor.claim(), None);
    }

    #[test]
    fn empty_cursor_never_claims() {
        assert_eq!(TaskCursor::new(0, true).claim(), None);
    }

    #[test]
    fn claim_pass_number() {
        let c = Claim { seq: 7, index: 1 };
        assert_eq!(c.pass(3), 2);
    }

    #[test]
    fn cursor_is_shared_across_threads_without_gaps() {
        let cursor = Arc::new(TaskCursor::new(5, true));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cursor = Arc::clone(&cursor);
                std::thread::spawn(move || {
                    (0..25).map(|_| cursor.claim().unwrap().seq).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seqs: Vec<usize> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        seqs.sort_unstable();
        assert_eq!(seqs, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn summary_counts_claims() {
        let s = RunSummary {
            tasks_per_worker: vec![3, 4],
            ..Default::default()
        };
        assert_eq!(s.tasks_claimed(), 7);
    }
}
