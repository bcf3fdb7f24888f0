//! Fleetsub Store - collaborator interfaces for the hub
//!
//! This crate defines what the hub needs from the outside world:
//!
//! - **ResourceStore**: get/list/create/update/delete/update-status over
//!   subscriptions, deployables and channels, with optimistic concurrency
//!   and owner-reference garbage collection
//! - **ObjectStore**: the bucket contract used by object-bucket channels
//!
//! ## In-Memory Implementations
//!
//! The in-memory stores are suitable for development and testing. Production
//! deployments talk to the real API server and object store through
//! implementations of the same traits.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod error;
pub mod memory;
pub mod object;
pub mod snapshot;
pub mod traits;

// Re-exports
pub use error::{ObjectResult, ObjectStoreError, Result, SnapshotError, StoreError};
pub use memory::{InMemoryResourceStore, StoreCall, StoreOp};
pub use object::{Credentials, InMemoryObjectStore, ObjectStore};
pub use snapshot::ResourceSnapshot;
pub use traits::{ChannelStore, DeployableStore, ListOptions, ResourceStore, SubscriptionStore};
