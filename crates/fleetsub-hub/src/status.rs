//! Subscription status rollup
//!
//! Status is derived: each pass recomputes the per-cluster breakdown from
//! what spokes reported on the hub Deployable and replaces the stored one.
//! Nothing from a previous rollup survives.

use crate::client::ApiClient;
use crate::error::Result;
use fleetsub_store::StoreError;
use fleetsub_types::{
    Deployable, DeployablePhase, Resource, Subscription, SubscriptionPerClusterStatus,
    SubscriptionPhase, SubscriptionStatus, GLOBAL_CLUSTER,
};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

/// Result of a status write attempt
#[derive(Debug, Clone)]
pub enum StatusWrite {
    /// Recomputed status equals the stored one
    Unchanged,
    Written,
    /// The write failed; the cycle carries on
    Failed(StoreError),
}

/// Status `current` becomes given the Deployable's per-cluster reports
///
/// A failed Deployable clears the breakdown and leaves phase, message and
/// reason alone. Otherwise the phase becomes `Propagated` and every
/// reporting cluster gets an entry: the `"/"` package statuses it reported
/// when deployed, an empty entry when not.
pub fn aggregate(
    current: &SubscriptionStatus,
    dpl: &Deployable,
) -> serde_json::Result<SubscriptionStatus> {
    if dpl.status.phase == DeployablePhase::Failed {
        return Ok(SubscriptionStatus {
            statuses: BTreeMap::new(),
            ..current.clone()
        });
    }

    let mut statuses = BTreeMap::new();
    for (cluster, unit) in &dpl.status.propagated_status {
        let entry = if unit.phase == DeployablePhase::Deployed {
            match &unit.resource_status {
                Some(raw) => {
                    let mut reported: SubscriptionStatus = serde_json::from_value(raw.clone())?;
                    reported.statuses.remove(GLOBAL_CLUSTER).unwrap_or_default()
                }
                None => SubscriptionPerClusterStatus::default(),
            }
        } else {
            SubscriptionPerClusterStatus::default()
        };
        statuses.insert(cluster.clone(), entry);
    }

    Ok(SubscriptionStatus {
        phase: SubscriptionPhase::Propagated,
        message: String::new(),
        reason: String::new(),
        last_update_time: current.last_update_time,
        statuses,
    })
}

/// Recompute the status of `sub` from `dpl` and write it when it changed
///
/// A decode failure aborts before anything is written. A failed write is
/// logged and reported as [`StatusWrite::Failed`] rather than returned as
/// an error, unlike every other write of the cycle.
#[instrument(skip_all, fields(subscription = %sub.key()))]
pub async fn update_status(
    api: &ApiClient,
    sub: &Subscription,
    dpl: &Deployable,
) -> Result<StatusWrite> {
    let next = aggregate(&sub.status, dpl)?;

    if next.same_state(&sub.status) {
        debug!("Status unchanged");
        return Ok(StatusWrite::Unchanged);
    }

    let mut updated = sub.clone();
    updated.status = next;
    updated.status.last_update_time = Some(chrono::Utc::now());

    match api.update_subscription_status(&updated).await {
        Ok(_) => {
            info!(
                phase = ?updated.status.phase,
                clusters = updated.status.statuses.len(),
                "Status updated"
            );
            Ok(StatusWrite::Written)
        }
        Err(e) => {
            warn!(error = %e, "Failed to update subscription status");
            Ok(StatusWrite::Failed(e))
        }
    }
}
