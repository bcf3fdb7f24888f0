//! Store error types

use fleetsub_types::ObjectKey;
use std::time::Duration;
use thiserror::Error;

/// Resource API store errors
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("{kind} {key} not found")]
    NotFound { kind: &'static str, key: ObjectKey },

    #[error("{kind} {key} already exists")]
    AlreadyExists { kind: &'static str, key: ObjectKey },

    #[error("conflict writing {kind} {key}: resource version {expected} is stale, current is {current}")]
    Conflict {
        kind: &'static str,
        key: ObjectKey,
        expected: String,
        current: String,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("timed out after {timeout:?} waiting for {operation}")]
    Timeout { operation: String, timeout: Duration },

    #[error("{operation} cancelled")]
    Cancelled { operation: String },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Object store errors
#[derive(Debug, Clone, Error)]
pub enum ObjectStoreError {
    #[error("bucket {0} not found")]
    BucketNotFound(String),

    #[error("bucket {0} already exists")]
    BucketExists(String),

    #[error("object {name} not found in bucket {bucket}")]
    ObjectNotFound { bucket: String, name: String },

    #[error("credential error: {0}")]
    Credential(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Snapshot load/save errors
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot decode error: {0}")]
    Decode(#[from] serde_yaml::Error),

    #[error("snapshot encode error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("snapshot store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for resource store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Result type for object store operations
pub type ObjectResult<T> = std::result::Result<T, ObjectStoreError>;
