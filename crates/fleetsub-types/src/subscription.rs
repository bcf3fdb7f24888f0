//! Subscription resource
//!
//! A Subscription selects artifacts from a channel and names the clusters
//! they should reach. Its status is a derived rollup of what the spokes
//! report back through the hub Deployable.

use crate::{
    annotations, ClusterOverrides, LabelSelector, ObjectMeta, Placement, Resource, TypeMeta, Uid,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Subscription resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    #[serde(flatten)]
    pub types: TypeMeta,

    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: SubscriptionSpec,

    #[serde(default)]
    pub status: SubscriptionStatus,
}

impl Resource for Subscription {
    const KIND: &'static str = "Subscription";

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

impl Subscription {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            types: TypeMeta::of::<Self>(),
            metadata: ObjectMeta::new(namespace, name),
            ..Default::default()
        }
    }

    pub fn uid(&self) -> &Uid {
        &self.metadata.uid
    }

    /// Name of the subscription this one is rolling towards, if annotated
    pub fn rolling_update_target(&self) -> Option<&str> {
        self.metadata.annotation(annotations::ROLLING_UPDATE_TARGET)
    }

    /// Name of the hub Deployable that distributes this subscription
    pub fn deployable_name(&self) -> String {
        format!("{}-deployable", self.metadata.name)
    }

    /// Name of the hub Deployable that mirrors the rollout target
    pub fn target_deployable_name(&self) -> String {
        format!("{}-target-deployable", self.metadata.name)
    }
}

/// Desired state of a subscription
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSpec {
    /// Channel reference, `namespace/name`
    #[serde(default)]
    pub channel: String,

    /// Single package to subscribe to
    #[serde(rename = "name", default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_filter: Option<PackageFilter>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub package_overrides: Vec<PackageOverrides>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<Placement>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<ClusterOverrides>,
}

/// Constraints narrowing which catalog artifacts are selected
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_selector: Option<LabelSelector>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    /// Semantic-version range, e.g. `1.2.x` or `>=1.0.0 <2.0.0`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Overrides for one package, evaluated by the spoke
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageOverrides {
    pub package_name: String,

    #[serde(default)]
    pub package_overrides: Vec<Value>,
}

/// Subscription phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionPhase {
    #[default]
    #[serde(rename = "")]
    Unset,
    Propagated,
    Subscribed,
    Failed,
    PropagationFailed,
}

impl SubscriptionPhase {
    pub fn is_unset(&self) -> bool {
        matches!(self, SubscriptionPhase::Unset)
    }
}

/// Observed state of a subscription
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    #[serde(default, skip_serializing_if = "SubscriptionPhase::is_unset")]
    pub phase: SubscriptionPhase,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<DateTime<Utc>>,

    /// Per-cluster rollup, keyed by cluster
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub statuses: BTreeMap<String, SubscriptionPerClusterStatus>,
}

impl SubscriptionStatus {
    /// Structural equality ignoring `last_update_time`
    pub fn same_state(&self, other: &SubscriptionStatus) -> bool {
        self.phase == other.phase
            && self.message == other.message
            && self.reason == other.reason
            && self.statuses == other.statuses
    }
}

/// Package outcomes reported for one cluster
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPerClusterStatus {
    #[serde(
        rename = "packages",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub packages: BTreeMap<String, SubscriptionUnitStatus>,
}

/// Outcome for one package on one cluster
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionUnitStatus {
    #[serde(default, skip_serializing_if = "SubscriptionPhase::is_unset")]
    pub phase: SubscriptionPhase,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_status: Option<Value>,
}

/// Spokes written in other languages emit `null` for empty maps
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
