//! Batch conversion orchestration.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle ──▶ Validating ──▶ Processing ──▶ Completed
//!            │                              (≥ 1 job succeeded)
//!            │ (rejected: back to Idle)
//!            ▼
//!          Idle                         ──▶ Failed
//!                                           (every job failed)
//! ```
//!
//! Validation is synchronous and all-or-nothing: a batch that breaks any cap
//! is rejected in one aggregated error and no job starts. Accepted jobs run
//! **strictly sequentially in submission order** — the conversion endpoint is
//! a single-flight resource per session, so even tiers that allow many files
//! per batch get one in-flight call at a time.
//!
//! A failed job never aborts the batch; its error is recorded on the job and
//! the next one runs. Only storage misconfiguration is fatal mid-batch.
//!
//! ## Resource guarantees
//!
//! When a staging [`BlobStore`] is configured, the staged object is deleted
//! after the job reaches a terminal state on **both** success and failure
//! paths. The progress ticker is aborted the instant the batch leaves
//! `Processing`, and again on drop, so tearing the workflow down mid-batch
//! leaves no timer running and no further state mutation can occur.

use crate::batch::{BatchOutput, BatchState, BatchStats, JobResult, JobStatus, SourceFile};
use crate::config::WorkflowConfig;
use crate::endpoint::ConversionEndpoint;
use crate::error::{JobError, ReadFastError};
use crate::progress::{NoopProgressCallback, ProgressCallback, ProgressGauge, ProgressTicker};
use crate::storage::BlobStore;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Orchestrates one batch at a time against an injected endpoint.
///
/// The batch state is owned exclusively by this instance; the host reads it
/// via [`ConversionWorkflow::state`] for rendering and never mutates it.
pub struct ConversionWorkflow {
    endpoint: Arc<dyn ConversionEndpoint>,
    staging: Option<Arc<dyn BlobStore>>,
    config: WorkflowConfig,
    state: Arc<Mutex<BatchState>>,
}

impl ConversionWorkflow {
    pub fn new(endpoint: Arc<dyn ConversionEndpoint>, config: WorkflowConfig) -> Self {
        Self {
            endpoint,
            staging: None,
            config,
            state: Arc::new(Mutex::new(BatchState::Idle)),
        }
    }

    /// Stage every source file in `store` before conversion. The staged
    /// object is always removed once its job is terminal.
    pub fn with_staging(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.staging = Some(store);
        self
    }

    /// Current batch state, for rendering.
    pub fn state(&self) -> BatchState {
        *self.state.lock().unwrap()
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Run a batch to completion.
    ///
    /// # Returns
    /// `Ok(BatchOutput)` when at least one job succeeded — check
    /// [`BatchOutput::error_summary`] for partial failures.
    ///
    /// # Errors
    /// - [`ReadFastError::BatchRejected`] — validation failed; state stays `Idle`
    /// - [`ReadFastError::BatchInProgress`] — another batch is active
    /// - [`ReadFastError::StorageNotConfigured`] — staging bucket missing (fatal)
    /// - [`ReadFastError::AllJobsFailed`] — every job failed
    pub async fn run_batch(&self, files: Vec<SourceFile>) -> Result<BatchOutput, ReadFastError> {
        let total_start = Instant::now();

        // ── Validate ─────────────────────────────────────────────────────
        self.transition_from_idle()?;
        if let Err(problems) = validate_batch(&files, &self.config) {
            *self.state.lock().unwrap() = BatchState::Idle;
            return Err(ReadFastError::BatchRejected { problems });
        }

        // If the caller's future is dropped mid-batch, this guard returns
        // the state to Idle; reaching a terminal state first disarms it.
        let mut cancel_guard = CancelGuard {
            state: Arc::clone(&self.state),
            armed: true,
        };

        *self.state.lock().unwrap() = BatchState::Processing;
        let total = files.len();
        info!("starting batch of {total} files");

        let callback: ProgressCallback = self
            .config
            .progress_callback
            .clone()
            .unwrap_or_else(|| Arc::new(NoopProgressCallback));
        callback.on_batch_start(total);

        // ── Process sequentially ─────────────────────────────────────────
        let gauge = Arc::new(Mutex::new(ProgressGauge::new(total)));
        let ticker = ProgressTicker::spawn(
            Arc::clone(&gauge),
            Arc::clone(&callback),
            Duration::from_millis(self.config.tick_interval_ms),
        );

        let bytes_in: u64 = files.iter().map(|f| f.len()).sum();
        let mut jobs: Vec<JobResult> = Vec::with_capacity(total);

        for (index, file) in files.into_iter().enumerate() {
            callback.on_job_start(index, total, &file.name);

            let result = match self.process_job(index, file).await {
                Ok(result) => result,
                Err(fatal) => {
                    // Storage misconfiguration: abort the whole batch.
                    ticker.stop();
                    gauge.lock().unwrap().finish();
                    *self.state.lock().unwrap() = BatchState::Failed;
                    cancel_guard.disarm();
                    return Err(fatal);
                }
            };

            match (&result.converted, &result.error) {
                (Some(converted), _) => callback.on_job_complete(
                    index,
                    total,
                    &result.source_name,
                    converted.bytes.len(),
                ),
                (_, Some(error)) => {
                    callback.on_job_error(index, total, &result.source_name, error.to_string())
                }
                _ => {}
            }

            gauge.lock().unwrap().complete_job();
            jobs.push(result);
        }

        // ── Settle ───────────────────────────────────────────────────────
        ticker.stop();
        gauge.lock().unwrap().finish();

        let succeeded = jobs.iter().filter(|j| j.succeeded()).count();
        let failed = jobs.len() - succeeded;
        callback.on_batch_complete(total, succeeded);

        if succeeded == 0 {
            *self.state.lock().unwrap() = BatchState::Failed;
            cancel_guard.disarm();
            let first_error = jobs
                .iter()
                .find_map(|j| j.error.as_ref())
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(ReadFastError::AllJobsFailed { total, first_error });
        }

        *self.state.lock().unwrap() = BatchState::Completed;
        cancel_guard.disarm();

        let stats = BatchStats {
            total_jobs: total,
            succeeded,
            failed,
            bytes_in,
            bytes_out: jobs
                .iter()
                .filter_map(|j| j.converted.as_ref())
                .map(|c| c.bytes.len() as u64)
                .sum(),
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };

        info!(
            "batch complete: {succeeded}/{total} files, {}ms",
            stats.total_duration_ms
        );

        Ok(BatchOutput {
            jobs,
            stats,
            state: BatchState::Completed,
        })
    }

    /// Run a batch and write every successful result into `dir`, one by one
    /// in job order, using atomic writes (temp file + rename).
    pub async fn run_batch_to_dir(
        &self,
        files: Vec<SourceFile>,
        dir: impl AsRef<Path>,
    ) -> Result<BatchOutput, ReadFastError> {
        let output = self.run_batch(files).await?;
        let dir = dir.as_ref();

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| ReadFastError::OutputWriteFailed {
                path: dir.to_path_buf(),
                source: e,
            })?;

        for converted in output.delivered() {
            let path = dir.join(&converted.name);
            let tmp_path = path.with_extension("part");
            tokio::fs::write(&tmp_path, &converted.bytes)
                .await
                .map_err(|e| ReadFastError::OutputWriteFailed {
                    path: path.clone(),
                    source: e,
                })?;
            tokio::fs::rename(&tmp_path, &path).await.map_err(|e| {
                ReadFastError::OutputWriteFailed {
                    path: path.clone(),
                    source: e,
                }
            })?;
            debug!("delivered {}", path.display());
        }

        Ok(output)
    }

    /// Synchronous wrapper around [`run_batch`](Self::run_batch).
    ///
    /// Creates a temporary tokio runtime internally.
    pub fn run_batch_sync(&self, files: Vec<SourceFile>) -> Result<BatchOutput, ReadFastError> {
        tokio::runtime::Runtime::new()
            .map_err(|e| ReadFastError::Internal(format!("Failed to create tokio runtime: {e}")))?
            .block_on(self.run_batch(files))
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    fn transition_from_idle(&self) -> Result<(), ReadFastError> {
        let mut state = self.state.lock().unwrap();
        match *state {
            BatchState::Validating | BatchState::Processing => Err(ReadFastError::BatchInProgress),
            _ => {
                *state = BatchState::Validating;
                Ok(())
            }
        }
    }

    /// Drive one job to a terminal state.
    ///
    /// Returns `Err` only for fatal storage misconfiguration; every other
    /// failure is captured in the returned `JobResult`.
    pub(crate) async fn process_job(
        &self,
        index: usize,
        file: SourceFile,
    ) -> Result<JobResult, ReadFastError> {
        let start = Instant::now();
        let name = file.name.clone();

        // ── Stage (optional) ─────────────────────────────────────────────
        let staged_id = match &self.staging {
            Some(store) => {
                debug!("job {index}: staging '{name}'");
                match store.upload(&name, &file.bytes).await {
                    Ok(id) => Some(id),
                    Err(e) if e.is_configuration() => {
                        return Err(e.into());
                    }
                    Err(e) => {
                        warn!("job {index}: staging failed for '{name}': {e}");
                        return Ok(JobResult {
                            index,
                            source_name: name.clone(),
                            status: JobStatus::Failed,
                            converted: None,
                            error: Some(JobError::Staging {
                                name,
                                detail: e.to_string(),
                            }),
                            duration_ms: start.elapsed().as_millis() as u64,
                        });
                    }
                }
            }
            None => None,
        };

        // ── Convert ──────────────────────────────────────────────────────
        debug!("job {index}: converting '{name}'");
        let timeout = Duration::from_secs(self.config.api_timeout_secs);
        let outcome = tokio::time::timeout(timeout, self.endpoint.convert(&file)).await;

        // ── Release staging before inspecting the outcome ────────────────
        if let (Some(store), Some(id)) = (&self.staging, &staged_id) {
            if let Err(e) = store.delete(id).await {
                warn!("job {index}: failed to clean up staged object '{id}': {e}");
            }
        }

        let (status, converted, error) = match outcome {
            Ok(Ok(converted)) => {
                debug!(
                    "job {index}: '{name}' done ({} bytes out)",
                    converted.bytes.len()
                );
                (JobStatus::Done, Some(converted), None)
            }
            Ok(Err(endpoint_err)) => {
                let job_err = endpoint_err.into_job_error(&name);
                warn!("job {index}: '{name}' failed — {job_err}");
                (JobStatus::Failed, None, Some(job_err))
            }
            Err(_elapsed) => {
                let job_err = JobError::Timeout {
                    name: name.clone(),
                    secs: self.config.api_timeout_secs,
                };
                warn!("job {index}: '{name}' timed out");
                (JobStatus::Failed, None, Some(job_err))
            }
        };

        Ok(JobResult {
            index,
            source_name: name,
            status,
            converted,
            error,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// Returns the state to `Idle` when a batch future is dropped before
/// reaching a terminal state (host teardown mid-batch).
struct CancelGuard {
    state: Arc<Mutex<BatchState>>,
    armed: bool,
}

impl CancelGuard {
    /// Terminal state has been recorded; nothing for Drop to undo.
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.state.lock().unwrap();
        if !state.is_terminal() {
            *state = BatchState::Idle;
        }
    }
}

/// Check a batch against the session's caps and the accepted-type set.
///
/// Collects **every** violation so the user sees one complete message
/// instead of fixing problems one resubmission at a time.
pub(crate) fn validate_batch(
    files: &[SourceFile],
    config: &WorkflowConfig,
) -> Result<(), Vec<String>> {
    let mut problems = Vec::new();
    let limits = &config.limits;

    if files.is_empty() {
        problems.push("no files submitted".to_string());
        return Err(problems);
    }

    if limits.files_disabled() {
        problems.push("file conversion is not available — please sign in".to_string());
        return Err(problems);
    }

    if let Some(max_files) = limits.max_concurrent_files {
        if files.len() > max_files {
            problems.push(format!(
                "too many files: {} submitted, limit is {max_files}",
                files.len()
            ));
        }
    }

    let aggregate: u64 = files.iter().map(|f| f.len()).sum();
    if aggregate > limits.max_file_bytes {
        problems.push(format!(
            "total size exceeds the limit ({}MB)",
            limits.max_file_bytes / (1024 * 1024)
        ));
    }

    for file in files {
        match file.kind() {
            Some(kind) if config.accepted_kinds.contains(&kind) => {}
            _ => problems.push(format!(
                "'{}': unsupported file type (accepted: PDF, EPUB, DOCX, TXT)",
                file.name
            )),
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::LimitProfile;

    fn config_with(limits: LimitProfile) -> WorkflowConfig {
        WorkflowConfig::builder().limits(limits).build().unwrap()
    }

    fn file(name: &str, size: usize) -> SourceFile {
        SourceFile::new(name, vec![0u8; size])
    }

    const MB: u64 = 1024 * 1024;

    fn pro_limits() -> LimitProfile {
        LimitProfile {
            max_chars: Some(50_000),
            max_file_bytes: 50 * MB,
            max_concurrent_files: None,
        }
    }

    #[test]
    fn empty_batch_is_rejected() {
        let config = config_with(pro_limits());
        let problems = validate_batch(&[], &config).unwrap_err();
        assert_eq!(problems, vec!["no files submitted"]);
    }

    #[test]
    fn disabled_file_path_rejects_everything() {
        let config = config_with(LimitProfile {
            max_chars: Some(5_000),
            max_file_bytes: 0,
            max_concurrent_files: Some(1),
        });
        let problems = validate_batch(&[file("a.pdf", 10)], &config).unwrap_err();
        assert!(problems[0].contains("sign in"), "got: {problems:?}");
    }

    #[test]
    fn file_count_cap_is_enforced() {
        let config = config_with(LimitProfile {
            max_chars: Some(50_000),
            max_file_bytes: 10 * MB,
            max_concurrent_files: Some(1),
        });
        let problems =
            validate_batch(&[file("a.pdf", 10), file("b.pdf", 10)], &config).unwrap_err();
        assert!(problems.iter().any(|p| p.contains("too many files")));
    }

    #[test]
    fn aggregate_size_cap_is_enforced() {
        let config = config_with(LimitProfile {
            max_chars: Some(50_000),
            max_file_bytes: 100,
            max_concurrent_files: None,
        });
        let problems =
            validate_batch(&[file("a.pdf", 60), file("b.pdf", 60)], &config).unwrap_err();
        assert!(problems.iter().any(|p| p.contains("total size")));
    }

    #[test]
    fn unsupported_types_are_named_individually() {
        let config = config_with(pro_limits());
        let problems = validate_batch(
            &[file("ok.pdf", 10), file("image.png", 10), file("noext", 10)],
            &config,
        )
        .unwrap_err();
        assert_eq!(problems.len(), 2);
        assert!(problems.iter().any(|p| p.contains("image.png")));
        assert!(problems.iter().any(|p| p.contains("noext")));
    }

    #[test]
    fn all_violations_reported_together() {
        let config = config_with(LimitProfile {
            max_chars: Some(50_000),
            max_file_bytes: 100,
            max_concurrent_files: Some(1),
        });
        let problems = validate_batch(
            &[file("a.pdf", 200), file("b.png", 10)],
            &config,
        )
        .unwrap_err();
        // count + size + type
        assert_eq!(problems.len(), 3, "got: {problems:?}");
    }

    #[test]
    fn valid_batch_passes() {
        let config = config_with(pro_limits());
        assert!(validate_batch(
            &[file("a.pdf", 100), file("b.epub", 100), file("c.docx", 100)],
            &config
        )
        .is_ok());
    }
}
