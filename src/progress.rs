//! Progress reporting: per-job events, an eased overall percentage, and the
//! timer that animates it.
//!
//! ## Why a callback trait?
//!
//! The callback approach is the least-invasive integration point: hosts can
//! forward events to a channel, a WebSocket, or a terminal progress bar
//! without the library knowing how the application communicates. Jobs run
//! strictly sequentially, but the trait is still `Send + Sync` so callbacks
//! can cross the ticker task boundary.
//!
//! ## Why an animated percentage?
//!
//! The conversion endpoint is a single request/response and reports no
//! incremental progress. The overall percentage is therefore a deterministic
//! eased curve: while a job's call is in flight it climbs quickly at first
//! and decelerates toward (but never reaches) that job's share ceiling; when
//! the call resolves it snaps to the ceiling, and when the whole batch is
//! terminal it snaps to exactly 100. The value is monotone non-decreasing
//! for the lifetime of a batch and equals 100 only at a terminal state.
//!
//! The ticker driving the curve is a plain tokio task; it is aborted the
//! moment the batch leaves `Processing` and again on drop, so no timer
//! outlives the workflow that started it.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Rotating status lines shown while a job is in flight.
pub const STATUS_MESSAGES: [&str; 4] = [
    "Converting your file…",
    "Extracting text…",
    "Applying fast-read emphasis…",
    "Almost there…",
];

/// Fraction of the remaining distance to the job ceiling covered per tick.
const EASE_FACTOR: f64 = 0.12;

/// Called by the workflow as a batch progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Job indexes are 0-based, submission order.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once after validation passes, before any job starts.
    fn on_batch_start(&self, total_jobs: usize) {
        let _ = total_jobs;
    }

    /// Called just before a job's staging upload / endpoint call.
    fn on_job_start(&self, index: usize, total_jobs: usize, name: &str) {
        let _ = (index, total_jobs, name);
    }

    /// Called when a job's converted file is in hand.
    fn on_job_complete(&self, index: usize, total_jobs: usize, name: &str, result_bytes: usize) {
        let _ = (index, total_jobs, name, result_bytes);
    }

    /// Called when a job fails terminally.
    fn on_job_error(&self, index: usize, total_jobs: usize, name: &str, error: String) {
        let _ = (index, total_jobs, name, error);
    }

    /// Fired by the animation ticker: the current eased overall percentage
    /// and a rotating status message.
    fn on_progress(&self, percent: f64, status: &'static str) {
        let _ = (percent, status);
    }

    /// Called once after every job reached a terminal state.
    fn on_batch_complete(&self, total_jobs: usize, success_count: usize) {
        let _ = (total_jobs, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in
/// [`crate::config::WorkflowConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

// ── Gauge ────────────────────────────────────────────────────────────────

/// Monotone overall-progress accumulator for one batch.
///
/// Each of the `total_jobs` jobs owns an equal share of [0, 100]. `tick`
/// eases toward the in-flight job's ceiling; `complete_job` snaps to it;
/// `finish` snaps to 100. Every mutation goes through a max() so the value
/// can never decrease within a batch.
#[derive(Debug)]
pub struct ProgressGauge {
    total_jobs: usize,
    completed_jobs: usize,
    percent: f64,
    finished: bool,
}

impl ProgressGauge {
    /// A fresh gauge at 0%.
    pub fn new(total_jobs: usize) -> Self {
        Self {
            total_jobs: total_jobs.max(1),
            completed_jobs: 0,
            percent: 0.0,
            finished: false,
        }
    }

    /// Current overall percentage in [0, 100].
    pub fn percent(&self) -> f64 {
        self.percent
    }

    /// Jobs that have reached a terminal state so far.
    pub fn current_index(&self) -> usize {
        self.completed_jobs
    }

    /// 100 is reached only via `finish`.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The exclusive upper bound while job `completed_jobs` is in flight.
    fn ceiling(&self) -> f64 {
        ((self.completed_jobs + 1) as f64 / self.total_jobs as f64) * 100.0
    }

    /// One animation step: move a fixed fraction of the remaining distance
    /// toward the in-flight job's ceiling. No-op once the batch is finished
    /// or all jobs are terminal.
    pub fn tick(&mut self) {
        if self.finished || self.completed_jobs >= self.total_jobs {
            return;
        }
        let eased = self.percent + (self.ceiling() - self.percent) * EASE_FACTOR;
        self.percent = self.percent.max(eased.min(100.0));
    }

    /// A job reached a terminal state (done or failed): advance the index
    /// and snap the percentage to the job's ceiling.
    pub fn complete_job(&mut self) {
        if self.completed_jobs >= self.total_jobs {
            return;
        }
        let ceiling = self.ceiling();
        self.completed_jobs += 1;
        self.percent = self.percent.max(ceiling.min(100.0));
    }

    /// The batch is terminal: snap to exactly 100.
    pub fn finish(&mut self) {
        self.finished = true;
        self.percent = 100.0;
    }
}

// ── Ticker ───────────────────────────────────────────────────────────────

/// The periodic task that animates a [`ProgressGauge`] and rotates status
/// messages through [`BatchProgressCallback::on_progress`].
///
/// Aborting is idempotent; the task is also aborted on drop so tearing down
/// a workflow mid-batch cannot leave a timer running. After `stop` no
/// further `on_progress` call is made — an already-scheduled tick dies with
/// the task before it can observe the gauge.
pub struct ProgressTicker {
    handle: JoinHandle<()>,
}

impl ProgressTicker {
    /// Spawn the animation loop.
    pub fn spawn(
        gauge: Arc<Mutex<ProgressGauge>>,
        callback: ProgressCallback,
        tick_interval: Duration,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick_interval);
            // The immediate first tick would fire at 0 elapsed time; skip it.
            interval.tick().await;
            let mut ticks: usize = 0;
            loop {
                interval.tick().await;
                let percent = {
                    let mut gauge = gauge.lock().unwrap();
                    if gauge.is_finished() {
                        break;
                    }
                    gauge.tick();
                    gauge.percent()
                };
                let status = STATUS_MESSAGES[ticks % STATUS_MESSAGES.len()];
                ticks = ticks.wrapping_add(1);
                callback.on_progress(percent, status);
            }
        });
        Self { handle }
    }

    /// Stop the animation immediately.
    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
