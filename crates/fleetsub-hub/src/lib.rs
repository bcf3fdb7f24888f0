//! # Fleetsub Hub
//!
//! Hub-side reconciliation of subscriptions into Deployables for
//! multi-cluster fan-out.
//!
//! ## Overview
//!
//! Each cycle of the [`SubscriptionReconciler`] handles one subscription:
//!
//! 1. Refresh the matched-artifact bookkeeping annotation
//! 2. Tear down generated Deployables when placement is withdrawn
//! 3. Synthesize the primary Deployable, applying global overrides
//! 4. Mirror the rolling-update target, when one is annotated
//! 5. Create or update the primary Deployable on drift
//! 6. Roll per-cluster spoke reports up into the subscription status
//!
//! ## Key Components
//!
//! - [`SubscriptionReconciler`]: runs cycles against a [`ResourceStore`]
//! - [`ApiClient`]: store access bounded by timeout and cancellation
//! - [`ChannelCatalog`]: channel resolution and candidate listing
//! - [`ArtifactFilter`]: package, annotation and version-range matching
//! - [`EventRecorder`]: sink for `Deploy` events
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fleetsub_hub::{BroadcastEventRecorder, HubConfig, SubscriptionReconciler};
//! use fleetsub_store::InMemoryResourceStore;
//! use fleetsub_types::ObjectKey;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> fleetsub_hub::Result<()> {
//! let hub = SubscriptionReconciler::new(
//!     Arc::new(InMemoryResourceStore::new()),
//!     &HubConfig::default(),
//!     Arc::new(BroadcastEventRecorder::new(1024)),
//! );
//!
//! let outcome = hub
//!     .reconcile(&ObjectKey::new("team-a", "nginx"), CancellationToken::new())
//!     .await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```
//!
//! [`ResourceStore`]: fleetsub_store::ResourceStore

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod bookkeeping;
pub mod catalog;
pub mod client;
pub mod config;
pub mod drift;
pub mod error;
pub mod events;
pub mod filter;
pub mod overrides;
pub mod reconciler;
pub mod rollout;
pub mod status;
pub mod synthesize;
pub mod teardown;
pub mod version;

// Re-exports
pub use catalog::{ChannelCatalog, ResolvedChannel};
pub use client::ApiClient;
pub use config::HubConfig;
pub use drift::{DriftAction, DriftOutcome};
pub use error::{HubError, OverrideError, Result, VersionRangeError};
pub use events::{BroadcastEventRecorder, EventOutcome, EventReason, EventRecorder, HubEvent};
pub use filter::{artifact_matches, ArtifactFilter};
pub use overrides::merge_overrides;
pub use reconciler::{CycleOutcome, SubscriptionReconciler};
pub use status::StatusWrite;
pub use synthesize::synthesize;
pub use teardown::TeardownReport;
pub use version::VersionRange;
