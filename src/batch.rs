//! Batch data model: source files, jobs, results, and aggregate stats.
//!
//! A batch is an ordered set of files accepted together and processed
//! strictly sequentially. Each file becomes one job; a job ends `Done` with a
//! converted file or `Failed` with a [`JobError`], and the batch completes as
//! long as at least one job succeeded.

use crate::error::JobError;
use serde::{Deserialize, Serialize};

/// File formats the conversion endpoint accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Pdf,
    Epub,
    Docx,
    Txt,
}

impl FileKind {
    /// Detect the kind from a filename extension (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        let ext = name.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase())?;
        match ext.as_str() {
            "pdf" => Some(FileKind::Pdf),
            "epub" => Some(FileKind::Epub),
            "docx" => Some(FileKind::Docx),
            "txt" => Some(FileKind::Txt),
            _ => None,
        }
    }

    /// MIME type used when submitting to the endpoint.
    pub fn mime_type(&self) -> &'static str {
        match self {
            FileKind::Pdf => "application/pdf",
            FileKind::Epub => "application/epub+zip",
            FileKind::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            FileKind::Txt => "text/plain",
        }
    }
}

/// One file submitted for conversion: opaque bytes plus the original name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub fn kind(&self) -> Option<FileKind> {
        FileKind::from_name(&self.name)
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A converted file returned by the endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Lifecycle of a single job.
///
/// `Uploading` covers the optional staging upload, `Converting` the endpoint
/// round trip; both are opaque to callers, which only act on the terminal
/// states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Uploading,
    Converting,
    Done,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }
}

/// Lifecycle of a batch.
///
/// `Validating` is synchronous; a rejected batch never leaves `Idle`.
/// `Failed` is reached only when every job failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchState {
    Idle,
    Validating,
    Processing,
    Completed,
    Failed,
}

impl BatchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchState::Completed | BatchState::Failed)
    }
}

/// Outcome of one job.
///
/// Exactly one of `converted` / `error` is set once the job is terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    /// Position in the batch (0-indexed, submission order).
    pub index: usize,
    /// Original filename, kept for the error summary and delivery naming.
    pub source_name: String,
    pub status: JobStatus,
    pub converted: Option<ConvertedFile>,
    pub error: Option<JobError>,
    /// Wall-clock time the job took, staging included.
    pub duration_ms: u64,
}

impl JobResult {
    pub fn succeeded(&self) -> bool {
        self.status == JobStatus::Done
    }
}

/// Aggregate counters for a finished batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchStats {
    pub total_jobs: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub total_duration_ms: u64,
}

/// Everything a completed batch produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutput {
    /// Per-job outcomes in submission order.
    pub jobs: Vec<JobResult>,
    pub stats: BatchStats,
    /// Terminal state: `Completed` (≥ 1 success) or `Failed` (all failed —
    /// though that case normally surfaces as an error instead).
    pub state: BatchState,
}

impl BatchOutput {
    /// Successfully converted files, in submission order.
    pub fn delivered(&self) -> impl Iterator<Item = &ConvertedFile> {
        self.jobs.iter().filter_map(|j| j.converted.as_ref())
    }

    /// One human-readable line per failed job, naming the original file.
    /// `None` when nothing failed.
    pub fn error_summary(&self) -> Option<String> {
        let lines: Vec<String> = self
            .jobs
            .iter()
            .filter_map(|j| j.error.as_ref())
            .map(|e| e.to_string())
            .collect();
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_kind_detection() {
        assert_eq!(FileKind::from_name("report.pdf"), Some(FileKind::Pdf));
        assert_eq!(FileKind::from_name("Book.EPUB"), Some(FileKind::Epub));
        assert_eq!(FileKind::from_name("notes.docx"), Some(FileKind::Docx));
        assert_eq!(FileKind::from_name("plain.txt"), Some(FileKind::Txt));
        assert_eq!(FileKind::from_name("image.png"), None);
        assert_eq!(FileKind::from_name("no_extension"), None);
    }

    #[test]
    fn terminal_states() {
        assert!(JobStatus::Done.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Converting.is_terminal());
        assert!(BatchState::Completed.is_terminal());
        assert!(BatchState::Failed.is_terminal());
        assert!(!BatchState::Processing.is_terminal());
        assert!(!BatchState::Idle.is_terminal());
    }

    #[test]
    fn error_summary_names_failed_files() {
        let output = BatchOutput {
            jobs: vec![
                JobResult {
                    index: 0,
                    source_name: "ok.pdf".into(),
                    status: JobStatus::Done,
                    converted: Some(ConvertedFile {
                        name: "converted-ok.pdf".into(),
                        bytes: vec![1],
                    }),
                    error: None,
                    duration_ms: 10,
                },
                JobResult {
                    index: 1,
                    source_name: "bad.pdf".into(),
                    status: JobStatus::Failed,
                    converted: None,
                    error: Some(crate::error::JobError::Transport {
                        name: "bad.pdf".into(),
                        detail: "connection reset".into(),
                    }),
                    duration_ms: 5,
                },
            ],
            stats: BatchStats::default(),
            state: BatchState::Completed,
        };

        let summary = output.error_summary().unwrap();
        assert!(summary.contains("bad.pdf"));
        assert!(!summary.contains("ok.pdf"));
        assert_eq!(output.delivered().count(), 1);
    }

    #[test]
    fn job_result_serialises() {
        let r = JobResult {
            index: 0,
            source_name: "a.pdf".into(),
            status: JobStatus::Done,
            converted: None,
            error: None,
            duration_ms: 0,
        };
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("\"done\""));
        let back: JobResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.status, JobStatus::Done);
    }
}
