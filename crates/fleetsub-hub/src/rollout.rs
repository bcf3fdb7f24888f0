//! Rolling-update target Deployable
//!
//! A subscription annotated with `rollingupdate-target` names the
//! subscription it is rolling towards. The hub mirrors that target into a
//! second Deployable, `<name>-target-deployable`, next to the primary one.
//! Once the target subscription is gone the rollout is considered retired
//! and nothing is written.

use crate::catalog::ChannelCatalog;
use crate::client::ApiClient;
use crate::drift::{reconcile_deployable, DriftOutcome};
use crate::error::Result;
use crate::events::EventRecorder;
use crate::synthesize::synthesize;
use fleetsub_types::{ObjectKey, Resource, Subscription};
use tracing::{info, instrument};

/// Synchronize the target Deployable of `sub`
///
/// Returns `None` when `sub` has no rollout target or the target
/// subscription no longer exists.
#[instrument(skip_all, fields(subscription = %sub.key()))]
pub async fn sync_rollout_target(
    api: &ApiClient,
    catalog: &ChannelCatalog,
    events: &dyn EventRecorder,
    sub: &Subscription,
) -> Result<Option<DriftOutcome>> {
    let Some(target_name) = sub.rolling_update_target() else {
        return Ok(None);
    };

    let target_key = ObjectKey::new(&sub.metadata.namespace, target_name);
    let target = match api.get_subscription(&target_key).await {
        Ok(target) => target,
        Err(e) if e.is_not_found() => {
            info!(target = %target_key, "Rollout target is gone");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let generation = catalog.channel_generation(api, &target).await;
    let mut desired = synthesize(&target, Some(sub), generation.as_deref())?;
    desired.metadata.name = sub.target_deployable_name();
    desired.metadata.namespace = sub.metadata.namespace.clone();

    let outcome =
        reconcile_deployable(api, events, &sub.key(), &desired, "target Deployable").await?;
    Ok(Some(outcome))
}
