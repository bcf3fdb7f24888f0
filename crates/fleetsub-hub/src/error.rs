//! Hub error types

use fleetsub_store::{ObjectStoreError, StoreError};
use fleetsub_types::SelectorError;
use thiserror::Error;

/// Errors that abort a reconciliation cycle
#[derive(Debug, Error)]
pub enum HubError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("override error: {0}")]
    Override(#[from] OverrideError),

    #[error("invalid label selector: {0}")]
    Selector(#[from] SelectorError),

    #[error("catalog error: {0}")]
    Catalog(#[from] ObjectStoreError),
}

impl HubError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, HubError::Store(e) if e.is_not_found())
    }
}

/// Failure applying an override op to a template
#[derive(Debug, Error)]
pub enum OverrideError {
    #[error("malformed override op: {0}")]
    Malformed(String),

    #[error("cannot descend into {segment:?} of {path:?}: not an object")]
    NotAnObject { path: String, segment: String },

    #[error("patch failed: {0}")]
    Patch(#[from] json_patch::PatchError),

    #[error("invalid patch op: {0}")]
    InvalidPatch(#[from] serde_json::Error),
}

/// Malformed version range expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionRangeError {
    #[error("empty version range")]
    Empty,

    #[error("invalid version {0:?}")]
    InvalidVersion(String),

    #[error("wildcard not allowed with operator in {0:?}")]
    WildcardOperator(String),
}

/// Result type for hub operations
pub type Result<T> = std::result::Result<T, HubError>;
