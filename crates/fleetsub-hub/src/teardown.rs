//! Placement withdrawal
//!
//! A subscription without placement distributes nothing. Its generated
//! Deployables are removed and the per-cluster rollup is cleared. Only
//! Deployables controlled by the subscription's UID are touched; a
//! same-named Deployable owned by someone else is left alone.

use crate::client::ApiClient;
use crate::error::Result;
use fleetsub_types::{ObjectKey, Resource, Subscription, SubscriptionPhase};
use tracing::{debug, info, instrument};

/// What a teardown pass changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    /// Deployables deleted, primary first
    pub deleted: Vec<ObjectKey>,
    /// Whether the subscription status was rewritten
    pub status_written: bool,
}

/// Remove everything `sub` distributed and clear its rollup
#[instrument(skip_all, fields(subscription = %sub.key()))]
pub async fn teardown(api: &ApiClient, sub: &Subscription) -> Result<TeardownReport> {
    let mut report = TeardownReport::default();
    let ns = &sub.metadata.namespace;

    for name in [sub.deployable_name(), sub.target_deployable_name()] {
        let key = ObjectKey::new(ns, name);
        let found = match api.get_deployable(&key).await {
            Ok(found) => found,
            Err(e) if e.is_not_found() => continue,
            Err(e) => return Err(e.into()),
        };

        if !found.metadata.is_owned_by(sub.uid()) {
            debug!(deployable = %key, "Skipping Deployable owned elsewhere");
            continue;
        }

        api.delete_deployable(&key).await?;
        info!(deployable = %key, "Deleted Deployable");
        report.deleted.push(key);
    }

    let mut next = sub.status.clone();
    next.statuses.clear();
    if next.phase == SubscriptionPhase::Propagated {
        next.phase = SubscriptionPhase::Unset;
        next.message.clear();
        next.reason.clear();
    }

    if !next.same_state(&sub.status) {
        let mut updated = sub.clone();
        updated.status = next;
        updated.status.last_update_time = Some(chrono::Utc::now());
        api.update_subscription_status(&updated).await?;
        info!("Cleared subscription status");
        report.status_written = true;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetsub_store::{
        DeployableStore, InMemoryResourceStore, StoreError, StoreOp, SubscriptionStore,
    };
    use fleetsub_types::{
        Deployable, OwnerReference, SubscriptionPerClusterStatus, SubscriptionStatus,
    };
    use std::sync::Arc;
    use std::time::Duration;

    async fn setup(status: SubscriptionStatus) -> (Arc<InMemoryResourceStore>, ApiClient, Subscription) {
        let store = Arc::new(InMemoryResourceStore::new());
        let api = ApiClient::new(store.clone(), Duration::from_secs(5));
        let sub = store
            .create_subscription(&Subscription::new("ns", "s"))
            .await
            .unwrap();
        let mut with_status = sub.clone();
        with_status.status = status;
        let sub = store.update_subscription_status(&with_status).await.unwrap();
        store.clear_journal().await;
        (store, api, sub)
    }

    fn propagated() -> SubscriptionStatus {
        let mut status = SubscriptionStatus {
            phase: SubscriptionPhase::Propagated,
            message: "ok".into(),
            ..Default::default()
        };
        status
            .statuses
            .insert("east".into(), SubscriptionPerClusterStatus::default());
        status
    }

    fn owned_by(sub: &Subscription, name: &str) -> Deployable {
        let mut dpl = Deployable::new("ns", name);
        dpl.metadata.set_controller(OwnerReference::controller_of(sub));
        dpl
    }

    #[tokio::test]
    async fn test_deletes_owned_and_clears_status() {
        let (store, api, sub) = setup(propagated()).await;
        store
            .create_deployable(&owned_by(&sub, "s-deployable"))
            .await
            .unwrap();
        store
            .create_deployable(&owned_by(&sub, "s-target-deployable"))
            .await
            .unwrap();

        let report = teardown(&api, &sub).await.unwrap();
        assert_eq!(
            report.deleted,
            vec![
                ObjectKey::new("ns", "s-deployable"),
                ObjectKey::new("ns", "s-target-deployable"),
            ]
        );
        assert!(report.status_written);

        let status_writes = store
            .mutations()
            .await
            .into_iter()
            .filter(|c| c.op == StoreOp::UpdateStatus)
            .count();
        assert_eq!(status_writes, 1);

        let stored = store.get_subscription(&sub.key()).await.unwrap();
        assert!(stored.status.statuses.is_empty());
        assert_eq!(stored.status.phase, SubscriptionPhase::Unset);
        assert!(stored.status.message.is_empty());
        assert!(stored.status.last_update_time.is_some());
    }

    #[tokio::test]
    async fn test_foreign_deployable_survives() {
        let (store, api, sub) = setup(SubscriptionStatus::default()).await;
        let mut other = Subscription::new("ns", "other");
        other.metadata.uid = fleetsub_types::Uid::new("someone-else");
        store
            .create_deployable(&owned_by(&other, "s-deployable"))
            .await
            .unwrap();
        store.clear_journal().await;

        let report = teardown(&api, &sub).await.unwrap();
        assert!(report.deleted.is_empty());
        assert!(!report.status_written);
        assert!(store.mutations().await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_status_is_not_rewritten() {
        let (store, api, sub) = setup(SubscriptionStatus::default()).await;
        let report = teardown(&api, &sub).await.unwrap();
        assert_eq!(report, TeardownReport::default());
        assert!(store.mutations().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_phase_is_kept() {
        let mut status = propagated();
        status.phase = SubscriptionPhase::Failed;
        let (store, api, sub) = setup(status).await;

        assert!(teardown(&api, &sub).await.unwrap().status_written);
        let stored = store.get_subscription(&sub.key()).await.unwrap();
        assert_eq!(stored.status.phase, SubscriptionPhase::Failed);
        assert_eq!(stored.status.message, "ok");
    }

    #[tokio::test]
    async fn test_delete_failure_propagates() {
        let (store, api, sub) = setup(propagated()).await;
        store
            .create_deployable(&owned_by(&sub, "s-deployable"))
            .await
            .unwrap();
        store
            .fail_next(StoreOp::Delete, "Deployable", StoreError::Transport("reset".into()))
            .await;

        assert!(teardown(&api, &sub).await.is_err());
        let stored = store.get_subscription(&sub.key()).await.unwrap();
        assert_eq!(stored.status.phase, SubscriptionPhase::Propagated);
    }
}
