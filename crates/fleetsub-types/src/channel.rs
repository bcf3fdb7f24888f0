//! Channel resource
//!
//! The hub only reads channels: to find where a subscription's catalog lives
//! and to stamp the channel generation on rendered templates.

use crate::{ObjectKey, ObjectMeta, Resource, Subscription, TypeMeta};
use serde::{Deserialize, Serialize};

/// Channel resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    #[serde(flatten)]
    pub types: TypeMeta,

    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: ChannelSpec,
}

impl Resource for Channel {
    const KIND: &'static str = "Channel";

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

impl Channel {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, kind: ChannelType) -> Self {
        Self {
            types: TypeMeta::of::<Self>(),
            metadata: ObjectMeta::new(namespace, name),
            spec: ChannelSpec {
                channel_type: kind,
                pathname: String::new(),
            },
        }
    }

    /// Bucket holding the catalog of an object-bucket channel: the last
    /// non-empty segment of its pathname
    pub fn bucket(&self) -> Option<&str> {
        if self.spec.channel_type != ChannelType::ObjectBucket {
            return None;
        }
        self.spec
            .pathname
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSpec {
    #[serde(rename = "type", default)]
    pub channel_type: ChannelType,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pathname: String,
}

/// Kind of catalog backing a channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    #[default]
    #[serde(alias = "Namespace")]
    Namespace,
    #[serde(alias = "HelmRepo")]
    HelmRepo,
    #[serde(alias = "ObjectBucket")]
    ObjectBucket,
    #[serde(alias = "GitHub")]
    GitHub,
    #[serde(other)]
    Unknown,
}

impl Subscription {
    /// Channel this subscription reads from
    ///
    /// `namespace/name` is taken literally; a bare name resolves in the
    /// subscription's own namespace. Any other shape names no channel.
    pub fn channel_key(&self) -> Option<ObjectKey> {
        let channel = self.spec.channel.trim();
        if channel.is_empty() {
            return None;
        }
        let parts: Vec<&str> = channel.split('/').collect();
        match parts.as_slice() {
            [name] => Some(ObjectKey::new(&self.metadata.namespace, *name)),
            [ns, name] if !ns.is_empty() && !name.is_empty() => Some(ObjectKey::new(*ns, *name)),
            _ => None,
        }
    }

    /// Namespace catalog artifacts are listed in
    ///
    /// The namespace half of a two-part reference is used even when the
    /// name half is empty; every other shape falls back to the
    /// subscription's own namespace.
    pub fn channel_namespace(&self) -> String {
        match self.spec.channel.trim().split('/').collect::<Vec<_>>().as_slice() {
            [ns, _] if !ns.is_empty() => ns.to_string(),
            _ => self.metadata.namespace.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_channel_key_resolution() {
        let mut sub = Subscription::new("team-a", "s");
        assert_eq!(sub.channel_key(), None);

        sub.spec.channel = "ch-ns/ch".into();
        assert_eq!(sub.channel_key(), Some(ObjectKey::new("ch-ns", "ch")));

        sub.spec.channel = "ch".into();
        assert_eq!(sub.channel_key(), Some(ObjectKey::new("team-a", "ch")));

        sub.spec.channel = "/ch".into();
        assert_eq!(sub.channel_key(), None);
        assert_eq!(sub.channel_namespace(), "team-a");

        sub.spec.channel = "ch-ns/".into();
        assert_eq!(sub.channel_key(), None);
        assert_eq!(sub.channel_namespace(), "ch-ns");

        sub.spec.channel = "a/b/c".into();
        assert_eq!(sub.channel_key(), None);
        assert_eq!(sub.channel_namespace(), "team-a");

        sub.spec.channel = "ch-ns/ch".into();
        assert_eq!(sub.channel_namespace(), "ch-ns");
        sub.spec.channel = String::new();
        assert_eq!(sub.channel_namespace(), "team-a");
    }

    #[test]
    fn test_bucket_from_pathname() {
        let mut ch = Channel::new("ch-ns", "ch", ChannelType::ObjectBucket);
        ch.spec.pathname = "http://minio:9000/charts/".into();
        assert_eq!(ch.bucket(), Some("charts"));

        ch.spec.channel_type = ChannelType::Namespace;
        assert_eq!(ch.bucket(), None);
    }

    #[test]
    fn test_channel_type_wire_values() {
        let ch: Channel = serde_json::from_value(json!({
            "metadata": {"name": "c", "namespace": "n"},
            "spec": {"type": "ObjectBucket", "pathname": "s3://b"}
        }))
        .unwrap();
        assert_eq!(ch.spec.channel_type, ChannelType::ObjectBucket);

        let ch: Channel = serde_json::from_value(json!({
            "spec": {"type": "somethingelse"}
        }))
        .unwrap();
        assert_eq!(ch.spec.channel_type, ChannelType::Unknown);
    }
}
