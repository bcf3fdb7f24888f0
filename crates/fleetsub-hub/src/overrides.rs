//! Override merge engine
//!
//! Global (`"/"`) overrides are applied to the rendered template on the hub.
//! Overrides for named clusters are carried on the Deployable untouched; the
//! spoke evaluates them.
//!
//! An override op is either a field-path assignment
//! `{"path": "spec.replicas", "value": 3}` or an RFC 6902 operation
//! `{"op": "replace", "path": "/spec/replicas", "value": 3}`.

use crate::error::OverrideError;
use fleetsub_types::ClusterOverrides;
use json_patch::PatchOperation;
use serde_json::{Map, Value};

/// Apply every global override to `template` in order and return the
/// overrides left for the spoke
pub fn merge_overrides(
    template: &mut Value,
    overrides: &[ClusterOverrides],
) -> Result<Vec<ClusterOverrides>, OverrideError> {
    let mut carried = Vec::new();
    for entry in overrides {
        if entry.is_global() {
            apply_ops(template, &entry.cluster_overrides)?;
        } else {
            carried.push(entry.clone());
        }
    }
    Ok(carried)
}

/// Apply override ops to a document in order
pub fn apply_ops(doc: &mut Value, ops: &[Value]) -> Result<(), OverrideError> {
    for op in ops {
        apply_op(doc, op)?;
    }
    Ok(())
}

fn apply_op(doc: &mut Value, op: &Value) -> Result<(), OverrideError> {
    let Some(fields) = op.as_object() else {
        return Err(OverrideError::Malformed(op.to_string()));
    };

    if fields.contains_key("op") {
        let operation: PatchOperation = serde_json::from_value(op.clone())?;
        json_patch::patch(doc, &[operation])?;
        return Ok(());
    }

    match (fields.get("path").and_then(Value::as_str), fields.get("value")) {
        (Some(path), Some(value)) => set_field(doc, path, value.clone()),
        _ => Err(OverrideError::Malformed(op.to_string())),
    }
}

/// Assign `value` at a dotted field path, creating intermediate objects.
/// An object value is merged into an existing object at the path.
fn set_field(doc: &mut Value, path: &str, value: Value) -> Result<(), OverrideError> {
    let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
    let Some((leaf, parents)) = segments.split_last() else {
        return Err(OverrideError::Malformed(format!("empty path {path:?}")));
    };

    let mut cursor = doc;
    for segment in parents {
        cursor = match cursor {
            Value::Object(map) => map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
            _ => {
                return Err(OverrideError::NotAnObject {
                    path: path.to_string(),
                    segment: segment.to_string(),
                })
            }
        };
    }

    let Value::Object(map) = cursor else {
        return Err(OverrideError::NotAnObject {
            path: path.to_string(),
            segment: leaf.to_string(),
        });
    };

    let merge = value.is_object() && map.get(*leaf).is_some_and(Value::is_object);
    if merge {
        if let Some(existing) = map.get_mut(*leaf) {
            json_patch::merge(existing, &value);
        }
    } else {
        map.insert(leaf.to_string(), value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(cluster: &str, ops: Vec<Value>) -> ClusterOverrides {
        ClusterOverrides {
            cluster_name: cluster.into(),
            cluster_overrides: ops,
        }
    }

    #[test]
    fn test_global_applied_and_dropped_named_carried() {
        let mut doc = json!({"spec": {"replicas": 1}});
        let named = entry("east", vec![json!({"path": "spec.replicas", "value": 5})]);
        let carried = merge_overrides(
            &mut doc,
            &[
                entry("/", vec![json!({"path": "spec.replicas", "value": 3})]),
                named.clone(),
            ],
        )
        .unwrap();

        assert_eq!(doc, json!({"spec": {"replicas": 3}}));
        assert_eq!(carried, vec![named]);
    }

    #[test]
    fn test_global_entries_apply_in_order() {
        let mut doc = json!({});
        merge_overrides(
            &mut doc,
            &[
                entry("/", vec![json!({"path": "spec.tier", "value": "gold"})]),
                entry(
                    "/",
                    vec![json!({"op": "copy", "from": "/spec/tier", "path": "/spec/previous"})],
                ),
                entry("/", vec![json!({"path": "spec.tier", "value": "silver"})]),
            ],
        )
        .unwrap();

        assert_eq!(doc, json!({"spec": {"tier": "silver", "previous": "gold"}}));
    }

    #[test]
    fn test_object_value_merges() {
        let mut doc = json!({"metadata": {"labels": {"app": "web", "tier": "1"}}});
        apply_ops(
            &mut doc,
            &[json!({"path": "metadata.labels", "value": {"tier": "2", "env": "prod"}})],
        )
        .unwrap();

        assert_eq!(
            doc,
            json!({"metadata": {"labels": {"app": "web", "tier": "2", "env": "prod"}}})
        );
    }

    #[test]
    fn test_rfc6902_ops() {
        let mut doc = json!({"spec": {"replicas": 1, "paused": true}});
        apply_ops(
            &mut doc,
            &[
                json!({"op": "replace", "path": "/spec/replicas", "value": 4}),
                json!({"op": "remove", "path": "/spec/paused"}),
            ],
        )
        .unwrap();
        assert_eq!(doc, json!({"spec": {"replicas": 4}}));

        let err = apply_ops(&mut doc, &[json!({"op": "remove", "path": "/spec/missing"})]);
        assert!(matches!(err, Err(OverrideError::Patch(_))));
    }

    #[test]
    fn test_scalar_on_path_is_rejected() {
        let mut doc = json!({"spec": "flat"});
        let err = apply_ops(&mut doc, &[json!({"path": "spec.replicas", "value": 2})]);
        assert!(matches!(err, Err(OverrideError::NotAnObject { .. })));
    }

    #[test]
    fn test_malformed_ops() {
        let mut doc = json!({});
        for op in [json!("replicas=3"), json!({"path": "spec.x"}), json!({"path": "", "value": 1})] {
            assert!(matches!(
                apply_ops(&mut doc, &[op]),
                Err(OverrideError::Malformed(_))
            ));
        }
    }
}
