//! Drift reconciliation of hub Deployables
//!
//! Creates the desired Deployable when it is missing and rewrites its spec
//! when the stored one has drifted. Templates are compared as decoded
//! documents so key order and whitespace never count as drift; an
//! unchanged Deployable costs no write.

use crate::client::ApiClient;
use crate::error::Result;
use crate::events::{EventRecorder, HubEvent};
use fleetsub_types::{annotations, Deployable, ObjectKey, Resource, Template};
use serde_json::Value;
use tracing::{debug, info, instrument};

/// What happened to a Deployable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftAction {
    Created,
    Updated,
    InSync,
}

#[derive(Debug, Clone)]
pub struct DriftOutcome {
    pub action: DriftAction,
    /// The Deployable as stored after the action
    pub deployable: Deployable,
}

/// Whether `found` already carries the spec of `desired`
pub fn in_sync(desired: &Deployable, found: &Deployable) -> Result<bool> {
    Ok(decode(desired.spec.template.as_ref())? == decode(found.spec.template.as_ref())?
        && desired.spec.overrides == found.spec.overrides
        && desired.spec.placement == found.spec.placement)
}

fn decode(template: Option<&Template>) -> Result<Value> {
    Ok(template.map(Template::decode).transpose()?.unwrap_or(Value::Null))
}

/// Create or update `desired`, recording a `Deploy` event against
/// `subscription` for every write
#[instrument(skip_all, fields(subscription = %subscription, deployable = %desired.key()))]
pub async fn reconcile_deployable(
    api: &ApiClient,
    events: &dyn EventRecorder,
    subscription: &ObjectKey,
    desired: &Deployable,
    label: &str,
) -> Result<DriftOutcome> {
    let key = desired.key();

    let found = match api.get_deployable(&key).await {
        Ok(found) => found,
        Err(e) if e.is_not_found() => {
            let created = api.create_deployable(desired).await;
            events.record(HubEvent::deploy(
                subscription,
                format!("{label} {key} created in the subscription namespace"),
                &created,
            ));
            let deployable = created?;
            info!("Created {label}");
            return Ok(DriftOutcome {
                action: DriftAction::Created,
                deployable,
            });
        }
        Err(e) => return Err(e.into()),
    };

    if in_sync(desired, &found)? {
        debug!("{label} in sync");
        return Ok(DriftOutcome {
            action: DriftAction::InSync,
            deployable: found,
        });
    }

    let mut next = found;
    next.spec = desired.spec.clone();
    next.metadata
        .annotations
        .insert(annotations::IS_GENERATED.to_string(), "true".to_string());
    next.metadata
        .annotations
        .insert(annotations::LOCAL.to_string(), "false".to_string());

    let updated = api.update_deployable(&next).await;
    events.record(HubEvent::deploy(
        subscription,
        format!("{label} {key} updated in the subscription namespace"),
        &updated,
    ));
    let deployable = updated?;
    info!("Updated {label}");
    Ok(DriftOutcome {
        action: DriftAction::Updated,
        deployable,
    })
}
