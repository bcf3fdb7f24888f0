//! Deployable synthesis
//!
//! Renders the desired hub Deployable for a subscription. The template is a
//! copy of the subscription prepared to be applied as-is on a spoke: local
//! placement, no overrides, no server-assigned identity, and an annotation
//! naming the hosting subscription.

use crate::error::Result;
use crate::overrides::merge_overrides;
use fleetsub_types::{
    annotations, Deployable, OwnerReference, Placement, Resource, Subscription,
    SubscriptionStatus, Template, TypeMeta, Uid,
};
use std::collections::BTreeMap;

/// Desired Deployable for `sub`
///
/// `root` is the subscription the Deployable is hosted for when it differs
/// from the one being rendered (rollout targets); its name and key replace
/// those of `sub` inside the template. `channel_generation` is stamped on
/// the template when known.
pub fn synthesize(
    sub: &Subscription,
    root: Option<&Subscription>,
    channel_generation: Option<&str>,
) -> Result<Deployable> {
    let host = root.unwrap_or(sub);

    let mut payload = sub.clone();
    payload.types = TypeMeta::of::<Subscription>();
    payload.spec.placement = Some(Placement::local());
    payload.spec.overrides.clear();
    payload.status = SubscriptionStatus::default();

    let meta = &mut payload.metadata;
    meta.name = host.metadata.name.clone();
    meta.resource_version.clear();
    meta.uid = Uid::default();
    meta.creation_timestamp = None;
    meta.self_link.clear();
    meta.generation = 1;

    let mut payload_annotations = BTreeMap::new();
    payload_annotations.insert(
        annotations::HOSTING_SUBSCRIPTION.to_string(),
        host.key().to_string(),
    );
    if let Some(generation) = channel_generation {
        payload_annotations.insert(
            annotations::CHANNEL_GENERATION.to_string(),
            generation.to_string(),
        );
    }
    meta.annotations = payload_annotations;

    let mut template = serde_json::to_value(&payload)?;
    let carried = merge_overrides(&mut template, &sub.spec.overrides)?;

    let mut dpl = Deployable::new(&sub.metadata.namespace, sub.deployable_name());
    dpl.metadata
        .annotations
        .insert(annotations::LOCAL.to_string(), "false".to_string());
    dpl.metadata
        .annotations
        .insert(annotations::IS_GENERATED.to_string(), "true".to_string());
    dpl.metadata
        .set_controller(OwnerReference::controller_of(sub));

    dpl.spec.template = Some(Template::encode(&template)?);
    dpl.spec.placement = sub.spec.placement.clone();
    dpl.spec.overrides = carried;

    Ok(dpl)
}
