//! Configuration for the conversion workflow.
//!
//! All workflow behaviour is controlled through [`WorkflowConfig`], built via
//! its [`WorkflowConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs, log them, and diff two runs.
//!
//! The limit profile is **injected** here, already resolved from the
//! session's tier — the workflow never consults global subscription state.
//! Re-resolve and rebuild on session change.

use crate::batch::FileKind;
use crate::error::ReadFastError;
use crate::policy::{LimitProfile, LimitTable, SessionState};
use crate::progress::ProgressCallback;
use std::fmt;

/// Configuration for one [`crate::workflow::ConversionWorkflow`].
///
/// Built via [`WorkflowConfig::builder()`] or [`WorkflowConfig::for_session`].
///
/// # Example
/// ```rust
/// use readfast::{LimitTable, SessionState, Tier, WorkflowConfig};
///
/// let session = SessionState::signed_in(Tier::Pro);
/// let config = WorkflowConfig::for_session(session, &LimitTable::default())
///     .api_timeout_secs(30)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct WorkflowConfig {
    /// Caps the batch is validated against. Resolved from the session's tier
    /// at construction; immutable for the lifetime of the config.
    pub limits: LimitProfile,

    /// File kinds the endpoint accepts. Default: PDF, EPUB, DOCX, TXT.
    pub accepted_kinds: Vec<FileKind>,

    /// Per-endpoint-call timeout in seconds. Default: 60.
    ///
    /// The upstream service specifies no timeout of its own; without this
    /// cap a hung call would stall the batch forever. A job that trips it
    /// fails with a timeout error and the batch moves on.
    pub api_timeout_secs: u64,

    /// Progress-animation tick interval in milliseconds. Default: 150.
    pub tick_interval_ms: u64,

    /// Progress events receiver. Default: none (no-op).
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            limits: LimitTable::default().resolve(Default::default(), true),
            accepted_kinds: vec![FileKind::Pdf, FileKind::Epub, FileKind::Docx, FileKind::Txt],
            api_timeout_secs: 60,
            tick_interval_ms: 150,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for WorkflowConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowConfig")
            .field("limits", &self.limits)
            .field("accepted_kinds", &self.accepted_kinds)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("tick_interval_ms", &self.tick_interval_ms)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl WorkflowConfig {
    /// Create a new builder with default values.
    pub fn builder() -> WorkflowConfigBuilder {
        WorkflowConfigBuilder {
            config: Self::default(),
        }
    }

    /// Builder pre-loaded with the limits `session` resolves to under `table`.
    pub fn for_session(session: SessionState, table: &LimitTable) -> WorkflowConfigBuilder {
        Self::builder().limits(session.limits(table))
    }
}

/// Builder for [`WorkflowConfig`].
pub struct WorkflowConfigBuilder {
    config: WorkflowConfig,
}

impl WorkflowConfigBuilder {
    pub fn limits(mut self, limits: LimitProfile) -> Self {
        self.config.limits = limits;
        self
    }

    pub fn accepted_kinds(mut self, kinds: Vec<FileKind>) -> Self {
        self.config.accepted_kinds = kinds;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn tick_interval_ms(mut self, ms: u64) -> Self {
        self.config.tick_interval_ms = ms.max(10);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<WorkflowConfig, ReadFastError> {
        let c = &self.config;
        if c.accepted_kinds.is_empty() {
            return Err(ReadFastError::InvalidConfig(
                "accepted_kinds must not be empty".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(ReadFastError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
