//! Streaming batch API: yield each job result as it settles.
//!
//! ## Why stream?
//!
//! A large batch takes a while at one sequential endpoint call per file. The
//! stream variant lets hosts surface each converted file the moment its job
//! reaches a terminal state instead of waiting for the whole batch, and
//! deliver downloads progressively.
//!
//! Unlike the eager [`crate::workflow::ConversionWorkflow::run_batch`], this
//! API drives no state machine and no progress ticker — results arrive in
//! submission order (processing is strictly sequential either way) and the
//! host derives progress from the indexes it has seen. Validation semantics
//! are identical: the batch is checked up front, all-or-nothing.

use crate::batch::{JobResult, SourceFile};
use crate::config::WorkflowConfig;
use crate::endpoint::ConversionEndpoint;
use crate::error::ReadFastError;
use crate::storage::BlobStore;
use crate::workflow::{validate_batch, ConversionWorkflow};
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of settled jobs.
///
/// `Err` items are fatal (storage misconfiguration); per-job failures are
/// inside `Ok(JobResult)` with `error` set.
pub type JobStream = Pin<Box<dyn Stream<Item = Result<JobResult, ReadFastError>> + Send>>;

/// Validate `files` and return a stream that converts them one at a time.
///
/// # Errors
/// [`ReadFastError::BatchRejected`] when validation fails; nothing is
/// submitted in that case.
pub fn run_batch_stream(
    endpoint: Arc<dyn ConversionEndpoint>,
    staging: Option<Arc<dyn BlobStore>>,
    config: WorkflowConfig,
    files: Vec<SourceFile>,
) -> Result<JobStream, ReadFastError> {
    if let Err(problems) = validate_batch(&files, &config) {
        return Err(ReadFastError::BatchRejected { problems });
    }

    info!("starting streaming batch of {} files", files.len());

    let mut workflow = ConversionWorkflow::new(endpoint, config);
    if let Some(store) = staging {
        workflow = workflow.with_staging(store);
    }
    let workflow = Arc::new(workflow);

    let s = stream::iter(files.into_iter().enumerate()).then(move |(index, file)| {
        let workflow = Arc::clone(&workflow);
        async move { workflow.process_job(index, file).await }
    });

    Ok(Box::pin(s))
}
