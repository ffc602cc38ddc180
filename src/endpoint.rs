//! The external conversion service boundary.
//!
//! The workflow never talks HTTP directly; it drives a [`ConversionEndpoint`]
//! trait object injected at construction. That keeps the orchestration
//! testable with a scripted endpoint and lets hosts swap transports (direct
//! HTTP, proxy through object storage, in-process converter) without touching
//! the batch logic.
//!
//! [`HttpConversionEndpoint`] is the production implementation: one
//! `POST /convert` per file, multipart body, bearer credential, converted
//! bytes back in the response body. The endpoint reports no incremental
//! progress — the call is a single request/response, which is why batch
//! progress is animated client-side (see [`crate::progress`]).

use crate::batch::{ConvertedFile, SourceFile};
use crate::error::JobError;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

/// Failure surfaced by a conversion endpoint call.
///
/// Captures the HTTP status class and any structured `detail` the service
/// returned so the workflow can map it onto a user-facing [`JobError`].
#[derive(Debug, Clone)]
pub struct EndpointError {
    /// HTTP status code, when a response was received at all.
    pub status: Option<u16>,
    /// The service's structured error detail, when the body carried one.
    pub detail: Option<String>,
    /// Transport-level description (connection refused, DNS, …).
    pub message: String,
}

impl EndpointError {
    /// Map onto the per-job error taxonomy.
    ///
    /// 401/403 become an auth error with a re-sign-in call to action; any
    /// other status surfaces the service's `detail` verbatim when present,
    /// otherwise a generic failure message.
    pub fn into_job_error(self, file_name: &str) -> JobError {
        match self.status {
            Some(401) | Some(403) => JobError::Auth {
                name: file_name.to_string(),
            },
            Some(status) => JobError::Transport {
                name: file_name.to_string(),
                detail: self
                    .detail
                    .unwrap_or_else(|| format!("Error processing file (HTTP {status})")),
            },
            None => JobError::Transport {
                name: file_name.to_string(),
                detail: self.message,
            },
        }
    }
}

impl std::fmt::Display for EndpointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.status, &self.detail) {
            (Some(s), Some(d)) => write!(f, "HTTP {s}: {d}"),
            (Some(s), None) => write!(f, "HTTP {s}: {}", self.message),
            _ => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for EndpointError {}

/// A service that converts one document per call.
///
/// Treated as a single-flight resource per session: the workflow never issues
/// more than one `convert` at a time.
#[async_trait]
pub trait ConversionEndpoint: Send + Sync {
    async fn convert(&self, file: &SourceFile) -> Result<ConvertedFile, EndpointError>;
}

/// Error body shape returned by the conversion service on 4xx/5xx.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

/// HTTP implementation of [`ConversionEndpoint`].
pub struct HttpConversionEndpoint {
    client: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl HttpConversionEndpoint {
    /// Build a client for the service at `base_url` (no trailing slash).
    pub fn new(base_url: impl Into<String>) -> Result<Self, EndpointError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| EndpointError {
                status: None,
                detail: None,
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            bearer_token: None,
        })
    }

    /// Attach the bearer credential sent with every request.
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Derive the output filename from Content-Disposition, falling back to
    /// `converted-<original>`.
    fn output_name(headers: &reqwest::header::HeaderMap, original: &str) -> String {
        headers
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split("filename=").nth(1))
            .map(|v| v.trim_matches(|c| c == '"' || c == ' ').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| format!("converted-{original}"))
    }
}

#[async_trait]
impl ConversionEndpoint for HttpConversionEndpoint {
    async fn convert(&self, file: &SourceFile) -> Result<ConvertedFile, EndpointError> {
        let url = format!("{}/convert", self.base_url);
        debug!("submitting '{}' ({} bytes) to {url}", file.name, file.len());

        let mut part =
            reqwest::multipart::Part::bytes(file.bytes.clone()).file_name(file.name.clone());
        if let Some(kind) = file.kind() {
            part = part.mime_str(kind.mime_type()).map_err(|e| EndpointError {
                status: None,
                detail: None,
                message: format!("invalid mime type: {e}"),
            })?;
        }
        let form = reqwest::multipart::Form::new().part("file", part);

        let mut request = self.client.post(&url).multipart(form);
        if let Some(ref token) = self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| EndpointError {
            status: None,
            detail: None,
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let headers_status = status.as_u16();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.detail)
                .ok();
            if detail.is_none() && !body.is_empty() {
                warn!("unstructured error body from endpoint (HTTP {headers_status})");
            }
            return Err(EndpointError {
                status: Some(headers_status),
                detail,
                message: format!("HTTP {headers_status}"),
            });
        }

        let name = Self::output_name(response.headers(), &file.name);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| EndpointError {
                status: None,
                detail: None,
                message: format!("failed to read response body: {e}"),
            })?
            .to_vec();

        debug!("received '{}' ({} bytes)", name, bytes.len());
        Ok(ConvertedFile { name, bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_statuses_map_to_auth_error() {
        for status in [401_u16, 403] {
            let e = EndpointError {
                status: Some(status),
                detail: Some("token expired".into()),
                message: format!("HTTP {status}"),
            };
            match e.into_job_error("doc.pdf") {
                JobError::Auth { name } => assert_eq!(name, "doc.pdf"),
                other => panic!("expected Auth for {status}, got {other:?}"),
            }
        }
    }

    #[test]
    fn detail_field_is_surfaced_verbatim() {
        let e = EndpointError {
            status: Some(400),
            detail: Some("Only PDF files are supported".into()),
            message: "HTTP 400".into(),
        };
        match e.into_job_error("doc.epub") {
            JobError::Transport { detail, .. } => {
                assert_eq!(detail, "Only PDF files are supported")
            }
            other => panic!("expected Transport, got {other:?}"),
        }
    }

    #[test]
    fn missing_detail_falls_back_to_generic_message() {
        let e = EndpointError {
            status: Some(502),
            detail: None,
            message: "HTTP 502".into(),
        };
        match e.into_job_error("doc.pdf") {
            JobError::Transport { detail, .. } => {
                assert!(detail.contains("502"), "got: {detail}")
            }
            other => panic!("expected Transport, got {other:?}"),
        }
    }

    #[test]
    fn network_failure_maps_to_transport_with_message() {
        let e = EndpointError {
            status: None,
            detail: None,
            message: "connection refused".into(),
        };
        match e.into_job_error("doc.pdf") {
            JobError::Transport { detail, .. } => assert_eq!(detail, "connection refused"),
            other => panic!("expected Transport, got {other:?}"),
        }
    }

    #[test]
    fn output_name_prefers_content_disposition() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::CONTENT_DISPOSITION,
            "attachment; filename=report_bionic.pdf".parse().unwrap(),
        );
        assert_eq!(
            HttpConversionEndpoint::output_name(&headers, "report.pdf"),
            "report_bionic.pdf"
        );

        let empty = reqwest::header::HeaderMap::new();
        assert_eq!(
            HttpConversionEndpoint::output_name(&empty, "report.pdf"),
            "converted-report.pdf"
        );
    }
}
