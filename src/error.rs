//! Error types for the readfast library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ReadFastError`] — **Fatal**: the operation cannot proceed at all
//!   (batch rejected by limit validation, storage misconfigured, every job
//!   failed). Returned as `Err(ReadFastError)` from the top-level workflow
//!   functions and from [`crate::editor::TextEditor::apply_edit`].
//!
//! * [`JobError`] — **Non-fatal**: a single conversion job failed (endpoint
//!   rejected it, network blip, timeout) but the rest of the batch is fine.
//!   Stored inside [`crate::batch::JobResult`] so callers can inspect partial
//!   success rather than losing the whole batch to one bad file.
//!
//! The separation lets callers decide their own tolerance: abort on the first
//! failed job, log and continue, or collect everything for a post-run report.
//!
//! Per-job errors never cross the batch boundary as `Err` — they are captured
//! into the owning job's terminal state and reported once.

use thiserror::Error;

/// All fatal errors returned by the readfast library.
///
/// Job-level failures use [`JobError`] and are stored in
/// [`crate::batch::JobResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ReadFastError {
    // ── Validation errors ─────────────────────────────────────────────────
    /// A text edit would exceed the tier's character cap. The previously
    /// accepted text is left untouched.
    #[error("Character limit exceeded: {attempted} characters, limit is {limit}\nSign in or upgrade for a higher limit.")]
    CharLimitExceeded { attempted: usize, limit: usize },

    /// Batch validation failed before any job started. The workflow stays
    /// `Idle`; no file was accepted. All violations are reported together.
    #[error("Batch rejected: {}", problems.join("; "))]
    BatchRejected { problems: Vec<String> },

    // ── Workflow errors ───────────────────────────────────────────────────
    /// Every job in the batch failed; there is nothing to deliver.
    #[error("All {total} files failed to convert.\nFirst error: {first_error}")]
    AllJobsFailed { total: usize, first_error: String },

    /// A batch was submitted while another is still processing.
    #[error("A batch is already processing; wait for it to finish before submitting another")]
    BatchInProgress,

    // ── Configuration errors ──────────────────────────────────────────────
    /// The staging storage bucket is absent or unreachable. Fatal for the
    /// current batch; surfaced verbatim, never retried.
    #[error("Storage system not configured properly: {detail}")]
    StorageNotConfigured { detail: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not write a delivered file to disk.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── External-store errors ─────────────────────────────────────────────
    /// The tier store could not be read or written.
    #[error("Tier lookup failed: {0}")]
    TierLookupFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single conversion job.
///
/// Stored in [`crate::batch::JobResult`] when a job fails. The batch
/// continues unless ALL jobs fail.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum JobError {
    /// The conversion endpoint rejected the credential (HTTP 401/403).
    /// Not retried; the user has to re-authenticate.
    #[error("'{name}': permission denied. Please sign in again.")]
    Auth { name: String },

    /// The endpoint or the network failed for this job. When the endpoint
    /// returned a structured `detail` field, that detail is surfaced;
    /// otherwise a generic message.
    #[error("'{name}': {detail}")]
    Transport { name: String, detail: String },

    /// The endpoint call exceeded the configured timeout.
    #[error("'{name}': conversion timed out after {secs}s")]
    Timeout { name: String, secs: u64 },

    /// Staging the file into the blob store failed.
    #[error("'{name}': staging upload failed: {detail}")]
    Staging { name: String, detail: String },
}

impl JobError {
    /// Original filename of the job this error belongs to.
    pub fn file_name(&self) -> &str {
        match self {
            JobError::Auth { name }
            | JobError::Transport { name, .. }
            | JobError::Timeout { name, .. }
            | JobError::Staging { name, .. } => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_rejected_joins_problems() {
        let e = ReadFastError::BatchRejected {
            problems: vec!["too many files".into(), "file too large".into()],
        };
        let msg = e.to_string();
        assert!(msg.contains("too many files; file too large"), "got: {msg}");
    }

    #[test]
    fn char_limit_display_names_both_numbers() {
        let e = ReadFastError::CharLimitExceeded {
            attempted: 5001,
            limit: 5000,
        };
        let msg = e.to_string();
        assert!(msg.contains("5001"));
        assert!(msg.contains("5000"));
    }

    #[test]
    fn auth_error_mentions_sign_in() {
        let e = JobError::Auth {
            name: "report.pdf".into(),
        };
        assert!(e.to_string().contains("sign in again"));
        assert_eq!(e.file_name(), "report.pdf");
    }

    #[test]
    fn transport_error_carries_detail() {
        let e = JobError::Transport {
            name: "notes.docx".into(),
            detail: "Only PDF files are supported".into(),
        };
        assert!(e.to_string().contains("Only PDF files are supported"));
    }

    #[test]
    fn timeout_display() {
        let e = JobError::Timeout {
            name: "big.pdf".into(),
            secs: 60,
        };
        assert!(e.to_string().contains("60s"));
    }
}
