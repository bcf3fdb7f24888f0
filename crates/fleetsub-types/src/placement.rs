//! Placement and per-cluster override declarations
//!
//! Placement computation is owned by the API layer; the hub only needs to
//! know whether a placement is present and to force local placement on
//! rendered templates. Everything else is carried through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Cluster name that addresses the hub itself: overrides under it are
/// applied to the template instead of being carried to the spoke
pub const GLOBAL_CLUSTER: &str = "/";

/// Where a subscription or Deployable should land
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local: Option<bool>,

    /// Cluster lists, selectors and placement-rule references
    #[serde(flatten)]
    pub rules: Map<String, Value>,
}

impl Placement {
    pub fn local() -> Self {
        Self {
            local: Some(true),
            rules: Map::new(),
        }
    }

    pub fn is_local(&self) -> bool {
        self.local.unwrap_or(false)
    }
}

/// Overrides targeting one cluster
///
/// The ops are opaque documents; their evaluation for named clusters belongs
/// to the spoke.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterOverrides {
    pub cluster_name: String,

    #[serde(default)]
    pub cluster_overrides: Vec<Value>,
}

impl ClusterOverrides {
    pub fn is_global(&self) -> bool {
        self.cluster_name == GLOBAL_CLUSTER
    }
}
