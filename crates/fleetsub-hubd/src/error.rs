//! Daemon error types

use fleetsub_hub::HubError;
use fleetsub_store::{ObjectStoreError, SnapshotError, StoreError};
use thiserror::Error;

/// Errors that stop the daemon
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("hub error: {0}")]
    Hub(#[from] HubError),

    #[error("catalog error: {0}")]
    Catalog(#[from] ObjectStoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for DaemonError {
    fn from(e: config::ConfigError) -> Self {
        DaemonError::Config(e.to_string())
    }
}

impl From<StoreError> for DaemonError {
    fn from(e: StoreError) -> Self {
        DaemonError::Hub(HubError::Store(e))
    }
}

/// Result type for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;
