//! Deployable resource
//!
//! A Deployable wraps one artifact payload (the template) together with the
//! placement it should reach and the per-cluster overrides the spoke applies.
//! Catalog artifacts in a channel are Deployables too.

use crate::{annotations, ClusterOverrides, ObjectMeta, Placement, Resource, TypeMeta};
use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, Error as _};
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// Deployable resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Deployable {
    #[serde(flatten)]
    pub types: TypeMeta,

    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: DeployableSpec,

    #[serde(default)]
    pub status: DeployableStatus,
}

impl Resource for Deployable {
    const KIND: &'static str = "Deployable";

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

impl Deployable {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            types: TypeMeta::of::<Self>(),
            metadata: ObjectMeta::new(namespace, name),
            ..Default::default()
        }
    }

    /// Version recorded on the artifact itself
    pub fn version(&self) -> Option<&str> {
        self.metadata.annotation(annotations::DEPLOYABLE_VERSION)
    }
}

/// Desired state of a Deployable
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployableSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<Template>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<Placement>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<ClusterOverrides>,
}

/// Serialized artifact payload
///
/// The payload is held in its encoded form and only decoded when a caller
/// needs to look inside it. Equality on `Template` is byte equality; callers
/// that need structural equality compare the decoded documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template(String);

impl Template {
    pub fn encode<T: Serialize>(value: &T) -> serde_json::Result<Self> {
        serde_json::to_string(value).map(Self)
    }

    /// Wrap an already-encoded payload as stored by the API layer
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn decode(&self) -> serde_json::Result<Value> {
        serde_json::from_str(&self.0)
    }

    pub fn decode_as<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.0)
    }

    /// `metadata.annotations` of the embedded object, when present and decodable
    pub fn annotations(&self) -> BTreeMap<String, String> {
        let Ok(doc) = self.decode() else {
            return BTreeMap::new();
        };
        doc.pointer("/metadata/annotations")
            .and_then(Value::as_object)
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Serialize for Template {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let doc: Value = serde_json::from_str(&self.0).map_err(S::Error::custom)?;
        doc.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Template {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let doc = Value::deserialize(deserializer)?;
        Template::encode(&doc).map_err(D::Error::custom)
    }
}

/// Deployable phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeployablePhase {
    #[default]
    #[serde(rename = "")]
    Unset,
    Propagated,
    Deployed,
    Failed,
}

impl DeployablePhase {
    pub fn is_unset(&self) -> bool {
        matches!(self, DeployablePhase::Unset)
    }
}

/// Observed state of a Deployable
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployableStatus {
    #[serde(default, skip_serializing_if = "DeployablePhase::is_unset")]
    pub phase: DeployablePhase,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    /// Outcome per cluster, as reported by spokes
    #[serde(
        default,
        alias = "targetClusters",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub propagated_status: BTreeMap<String, ResourceUnitStatus>,
}

/// Outcome of a Deployable on one cluster
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceUnitStatus {
    #[serde(default, skip_serializing_if = "DeployablePhase::is_unset")]
    pub phase: DeployablePhase,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<DateTime<Utc>>,

    /// Status of the deployed resource, opaque to the Deployable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_status: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_template_embeds_as_document() {
        let mut dpl = Deployable::new("ns", "a");
        dpl.spec.template = Some(Template::encode(&json!({"kind": "ConfigMap"})).unwrap());

        let wire = serde_json::to_value(&dpl).unwrap();
        assert_eq!(wire["spec"]["template"]["kind"], "ConfigMap");

        let back: Deployable = serde_json::from_value(wire).unwrap();
        assert_eq!(
            back.spec.template.unwrap().decode().unwrap(),
            json!({"kind": "ConfigMap"})
        );
    }

    #[test]
    fn test_template_from_yaml() {
        let yaml = r#"
kind: Deployable
apiVersion: app.ibm.com/v1alpha1
metadata:
  name: nginx
  namespace: ch
  annotations:
    app.ibm.com/deployable-version: 1.2.3
spec:
  template:
    kind: Service
    metadata:
      annotations:
        tier: web
"#;
        let dpl: Deployable = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(dpl.version(), Some("1.2.3"));
        let tpl = dpl.spec.template.unwrap();
        assert_eq!(tpl.annotations().get("tier").map(String::as_str), Some("web"));
    }

    #[test]
    fn test_template_annotations_tolerate_garbage() {
        assert!(Template::from_raw("not json").annotations().is_empty());
        assert!(Template::encode(&json!({"metadata": {}}))
            .unwrap()
            .annotations()
            .is_empty());
    }

    #[test]
    fn test_propagated_status_accepts_legacy_name() {
        let status: DeployableStatus = serde_json::from_value(json!({
            "phase": "Propagated",
            "targetClusters": {"east": {"phase": "Deployed"}}
        }))
        .unwrap();
        assert_eq!(status.phase, DeployablePhase::Propagated);
        assert_eq!(
            status.propagated_status["east"].phase,
            DeployablePhase::Deployed
        );
    }
}
