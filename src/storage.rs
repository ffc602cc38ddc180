//! Staging object storage for the proxy-through-storage conversion variant.
//!
//! Some deployments stage uploads in a shared bucket before the conversion
//! service picks them up. The workflow treats the store as optional: when a
//! [`BlobStore`] is configured, every job's source file is uploaded before the
//! endpoint call and the staged object is **always** deleted once the job
//! reaches a terminal state — success and failure alike. Files that go
//! straight to the endpoint never touch the store.

use crate::error::ReadFastError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use thiserror::Error;

/// Failures raised by a blob store implementation.
#[derive(Debug, Clone, Error)]
pub enum BlobError {
    /// The configured bucket does not exist or is not accessible. This is an
    /// environment problem, not a per-file one — it aborts the whole batch.
    #[error("bucket '{bucket}' not found or not accessible")]
    BucketMissing { bucket: String },

    /// The object id was not found on download/delete.
    #[error("object '{id}' not found")]
    NotFound { id: String },

    /// Any other store failure.
    #[error("{0}")]
    Other(String),
}

impl BlobError {
    /// True when the error means the store itself is misconfigured.
    pub fn is_configuration(&self) -> bool {
        matches!(self, BlobError::BucketMissing { .. })
    }
}

impl From<BlobError> for ReadFastError {
    fn from(e: BlobError) -> Self {
        ReadFastError::StorageNotConfigured {
            detail: e.to_string(),
        }
    }
}

/// Object storage with upload/download/delete semantics.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under a fresh identifier derived from `name`.
    async fn upload(&self, name: &str, bytes: &[u8]) -> Result<String, BlobError>;

    /// Fetch an object by the identifier `upload` returned.
    async fn download(&self, id: &str) -> Result<Vec<u8>, BlobError>;

    /// Remove an object. Deleting an already-deleted id is an error
    /// (`NotFound`), which callers on cleanup paths log and ignore.
    async fn delete(&self, id: &str) -> Result<(), BlobError>;
}

/// In-memory [`BlobStore`] for tests and demos.
///
/// Ids are `<seq>_<name>`, mirroring the timestamp-prefixed naming of the
/// production bucket while staying deterministic.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    seq: AtomicU64,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects currently held. Lets tests assert the
    /// nothing-left-behind cleanup guarantee.
    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, name: &str, bytes: &[u8]) -> Result<String, BlobError> {
        let id = format!("{}_{}", self.seq.fetch_add(1, Ordering::SeqCst), name);
        self.objects
            .lock()
            .unwrap()
            .insert(id.clone(), bytes.to_vec());
        Ok(id)
    }

    async fn download(&self, id: &str) -> Result<Vec<u8>, BlobError> {
        self.objects
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| BlobError::NotFound { id: id.to_string() })
    }

    async fn delete(&self, id: &str) -> Result<(), BlobError> {
        self.objects
            .lock()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| BlobError::NotFound { id: id.to_string() })
    }
}
