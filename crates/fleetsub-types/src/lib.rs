//! Fleetsub Types - resource model for multi-cluster subscriptions
//!
//! The hub reconciles three resource kinds:
//!
//! - **Subscription**: declarative intent selecting catalog artifacts from a
//!   channel and naming the clusters they should reach
//! - **Deployable**: distribution object carrying one artifact payload, its
//!   placement, and the per-cluster overrides the spoke evaluates
//! - **Channel**: namespaced catalog of available artifacts
//!
//! Wire formats follow the `app.ibm.com/v1alpha1` API so objects written by
//! the API layer and by spoke agents decode unchanged.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod annotations;
pub mod channel;
pub mod deployable;
pub mod ids;
pub mod meta;
pub mod placement;
pub mod selector;
pub mod subscription;

// Re-export main types
pub use annotations::DeployableKeySet;
pub use channel::{Channel, ChannelSpec, ChannelType};
pub use deployable::{
    Deployable, DeployablePhase, DeployableSpec, DeployableStatus, ResourceUnitStatus, Template,
};
pub use ids::{ObjectKey, ObjectKeyParseError, Uid};
pub use meta::{ObjectMeta, OwnerReference, Resource, TypeMeta, API_VERSION, GROUP};
pub use placement::{ClusterOverrides, Placement, GLOBAL_CLUSTER};
pub use selector::{LabelSelector, LabelSelectorRequirement, Requirement, Selector, SelectorError};
pub use subscription::{
    PackageFilter, PackageOverrides, Subscription, SubscriptionPerClusterStatus,
    SubscriptionPhase, SubscriptionSpec, SubscriptionStatus, SubscriptionUnitStatus,
};
