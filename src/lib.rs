//! # readfast
//!
//! Bionic-reading text transformation with tiered limits, plus a batch
//! document-conversion workflow against an external conversion service.
//!
//! ## Why this crate?
//!
//! "Fast read" rendering emphasises the first characters of every word so
//! readers can anchor on word starts and skim the rest. Doing that well takes
//! three pieces with real invariants: a transform whose output must strip
//! back to the input byte-for-byte, a limit policy that has to reject input
//! without corrupting accepted state, and a batch workflow that must survive
//! partial failure, keep progress monotone, and never leak a staged upload.
//! This crate is those three pieces, with the CRUD around them (auth,
//! billing, storage buckets) kept behind small trait boundaries.
//!
//! ## Pipeline Overview
//!
//! ```text
//! text ──▶ TierPolicy.resolve ──▶ TextEditor ──▶ bionic markup
//!
//! files ──▶ validate (caps, types) ──▶ [stage] ──▶ convert ──▶ deliver
//!            │                          one at a time, in order
//!            └ reject whole batch       partial failures recorded per job
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use readfast::{bionic, LimitTable, SessionState, TextEditor, Tier};
//!
//! // The pure transform:
//! assert_eq!(bionic::transform("cat"), "<strong>c</strong>at");
//!
//! // The bounded text path:
//! let limits = SessionState::signed_in(Tier::Free).limits(&LimitTable::default());
//! let mut editor = TextEditor::new(limits);
//! editor.apply_edit("read faster today").unwrap();
//! assert_eq!(bionic::strip_emphasis(editor.rendered()), "read faster today");
//! ```
//!
//! Batch conversion against a service:
//!
//! ```rust,no_run
//! use readfast::{
//!     ConversionWorkflow, HttpConversionEndpoint, LimitTable, SessionState, SourceFile,
//!     Tier, WorkflowConfig,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let endpoint = Arc::new(
//!         HttpConversionEndpoint::new("https://api.readfast.app")?.with_bearer("token"),
//!     );
//!     let config = WorkflowConfig::for_session(
//!         SessionState::signed_in(Tier::Pro),
//!         &LimitTable::default(),
//!     )
//!     .build()?;
//!
//!     let workflow = ConversionWorkflow::new(endpoint, config);
//!     let files = vec![SourceFile::new("paper.pdf", std::fs::read("paper.pdf")?)];
//!     let output = workflow.run_batch_to_dir(files, "out/").await?;
//!     println!("{}/{} files converted", output.stats.succeeded, output.stats.total_jobs);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `readfast` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! readfast = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod bionic;
pub mod config;
pub mod editor;
pub mod endpoint;
pub mod error;
pub mod policy;
pub mod progress;
pub mod storage;
pub mod stream;
pub mod workflow;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{
    BatchOutput, BatchState, BatchStats, ConvertedFile, FileKind, JobResult, JobStatus, SourceFile,
};
pub use config::{WorkflowConfig, WorkflowConfigBuilder};
pub use editor::TextEditor;
pub use endpoint::{ConversionEndpoint, EndpointError, HttpConversionEndpoint};
pub use error::{JobError, ReadFastError};
pub use policy::{
    resolve_tier, FixedTierLookup, LimitProfile, LimitTable, SessionFeed, SessionState, Tier,
    TierLookup,
};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use storage::{BlobError, BlobStore, MemoryBlobStore};
pub use stream::{run_batch_stream, JobStream};
pub use workflow::ConversionWorkflow;
