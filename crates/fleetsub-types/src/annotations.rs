//! Annotation protocol shared with the spoke agent and channel controllers

use crate::ObjectKey;
use std::collections::BTreeSet;
use std::fmt;

/// Comma-joined set of catalog artifacts currently matched by a subscription
pub const DEPLOYABLES: &str = "app.ibm.com/deployables";

/// Name of the subscription that is the next version in a staged rollout
pub const ROLLING_UPDATE_TARGET: &str = "app.ibm.com/rollingupdate-target";

/// Generation of the channel at the time the template was rendered
pub const CHANNEL_GENERATION: &str = "app.ibm.com/channel-generation";

/// Hosting subscription of a rendered template, as `namespace/name`
pub const HOSTING_SUBSCRIPTION: &str = "app.ibm.com/subscription";

/// Marks a Deployable as produced by the hub rather than authored
pub const IS_GENERATED: &str = "app.ibm.com/is-generated";

/// Placement locality of a Deployable (`"true"` / `"false"`)
pub const LOCAL: &str = "app.ibm.com/local";

/// Version recorded on a catalog artifact, evaluated by version filters
pub const DEPLOYABLE_VERSION: &str = "app.ibm.com/deployable-version";

/// Set of catalog artifact keys behind the [`DEPLOYABLES`] annotation
///
/// The wire value is unordered; encoding is sorted so the same set always
/// produces the same string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployableKeySet(BTreeSet<String>);

impl DeployableKeySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the annotation value; empty segments are ignored
    pub fn parse(value: &str) -> Self {
        Self(
            value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn insert(&mut self, key: &ObjectKey) -> bool {
        self.0.insert(key.to_string())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Annotation value for this set
    pub fn encode(&self) -> String {
        self.0.iter().map(String::as_str).collect::<Vec<_>>().join(",")
    }
}

impl FromIterator<ObjectKey> for DeployableKeySet {
    fn from_iter<I: IntoIterator<Item = ObjectKey>>(iter: I) -> Self {
        Self(iter.into_iter().map(|k| k.to_string()).collect())
    }
}

impl fmt::Display for DeployableKeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_does_not_change_set() {
        let a = DeployableKeySet::parse("ch/b,ch/a");
        let b = DeployableKeySet::parse("ch/a,ch/b");
        assert_eq!(a, b);
        assert_eq!(a.encode(), "ch/a,ch/b");
    }

    #[test]
    fn test_empty_value_is_empty_set() {
        assert!(DeployableKeySet::parse("").is_empty());
        assert!(DeployableKeySet::parse(" , ").is_empty());
        assert_eq!(DeployableKeySet::new().encode(), "");
    }

    #[test]
    fn test_collect_from_keys() {
        let set: DeployableKeySet = vec![
            ObjectKey::new("ch", "nginx"),
            ObjectKey::new("ch", "nginx"),
            ObjectKey::new("ch", "redis"),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains("ch/redis"));
    }
}
