//! Reconciliation scheduler
//!
//! Drives cycles for every subscription in the store. Within one pass each
//! subscription key is handled by exactly one task, so two cycles for the
//! same subscription never overlap; distinct subscriptions run concurrently
//! up to the configured limit. A cycle that wrote is followed by another
//! one for the same key, the way a watch event on the written object would
//! trigger it.

use crate::config::SchedulerConfig;
use crate::error::DaemonResult;
use fleetsub_hub::{CycleOutcome, SubscriptionReconciler};
use fleetsub_store::ListOptions;
use fleetsub_types::{ObjectKey, Resource};
use futures::stream::{self, StreamExt};
use std::future::Future;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;

/// Totals for one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Subscriptions visited
    pub subscriptions: usize,
    /// Cycles run, requeues included
    pub cycles: usize,
    /// Subscriptions whose last cycle failed
    pub failed: usize,
    /// Subscriptions still writing when their cycle budget ran out
    pub unsettled: usize,
}

/// Scheduler state
pub struct Scheduler {
    config: SchedulerConfig,
    reconciler: SubscriptionReconciler,
    cancel: CancellationToken,
}

impl Scheduler {
    /// Create a new scheduler
    pub fn new(config: SchedulerConfig, reconciler: SubscriptionReconciler) -> Self {
        Self {
            config,
            reconciler,
            cancel: CancellationToken::new(),
        }
    }

    /// Token whose cancellation stops in-flight cycles
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Reconcile every subscription once
    pub async fn run_pass(&self) -> DaemonResult<PassSummary> {
        let keys: Vec<ObjectKey> = self
            .reconciler
            .api()
            .list_subscriptions(&ListOptions::default())
            .await?
            .iter()
            .map(Resource::key)
            .collect();

        let mut summary = PassSummary {
            subscriptions: keys.len(),
            ..Default::default()
        };

        let results: Vec<KeyResult> = stream::iter(keys)
            .map(|key| self.settle(key))
            .buffer_unordered(self.config.max_concurrent_reconciliations.max(1))
            .collect()
            .await;

        for result in results {
            summary.cycles += result.cycles;
            if result.failed {
                summary.failed += 1;
            }
            if result.unsettled {
                summary.unsettled += 1;
            }
        }

        tracing::info!(
            subscriptions = summary.subscriptions,
            cycles = summary.cycles,
            failed = summary.failed,
            unsettled = summary.unsettled,
            "Reconciliation pass complete"
        );
        Ok(summary)
    }

    /// Run passes on the configured interval until `shutdown` resolves
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        tracing::info!(
            interval_secs = self.config.reconcile_interval().as_secs(),
            "Scheduler started"
        );

        let mut ticker = interval(self.config.reconcile_interval());
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    self.cancel.cancel();
                    break;
                }
                _ = ticker.tick() => {}
            }

            let pass = self.run_pass();
            tokio::pin!(pass);
            let result = tokio::select! {
                result = &mut pass => result,
                _ = &mut shutdown => {
                    // In-flight cycles observe the token and return early
                    self.cancel.cancel();
                    let result = pass.await;
                    log_pass_error(result);
                    break;
                }
            };
            log_pass_error(result);
        }

        tracing::info!("Scheduler stopped");
    }

    /// Cycle one subscription until it stops writing or its budget is spent
    async fn settle(&self, key: ObjectKey) -> KeyResult {
        let mut result = KeyResult::default();
        let budget = self.config.max_cycles_per_pass.max(1);

        while result.cycles < budget {
            if self.cancel.is_cancelled() {
                break;
            }
            result.cycles += 1;

            match self.reconciler.reconcile(&key, self.cancel.child_token()).await {
                Ok(outcome) => {
                    tracing::debug!(
                        subscription = %key,
                        outcome = ?OutcomeKind::from(&outcome),
                        "Cycle finished"
                    );
                    result.failed = false;
                    if !outcome.wrote() {
                        result.unsettled = false;
                        return result;
                    }
                    result.unsettled = true;
                }
                Err(e) => {
                    tracing::error!(
                        subscription = %key,
                        error = %e,
                        "Failed to reconcile subscription"
                    );
                    result.failed = true;
                    result.unsettled = false;
                    return result;
                }
            }
        }
        result
    }
}

fn log_pass_error(result: DaemonResult<PassSummary>) {
    if let Err(e) = result {
        tracing::error!(error = %e, "Reconciliation pass failed");
    }
}

#[derive(Debug, Default)]
struct KeyResult {
    cycles: usize,
    failed: bool,
    unsettled: bool,
}

/// Compact outcome label for logs
#[derive(Debug)]
enum OutcomeKind {
    Gone,
    BookkeepingRefreshed,
    TornDown,
    Deployed,
}

impl From<&CycleOutcome> for OutcomeKind {
    fn from(outcome: &CycleOutcome) -> Self {
        match outcome {
            CycleOutcome::Gone => OutcomeKind::Gone,
            CycleOutcome::BookkeepingRefreshed => OutcomeKind::BookkeepingRefreshed,
            CycleOutcome::TornDown(_) => OutcomeKind::TornDown,
            CycleOutcome::Deployed { .. } => OutcomeKind::Deployed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fleetsub_hub::{BroadcastEventRecorder, HubConfig};
    use fleetsub_store::{
        ChannelStore, DeployableStore, InMemoryResourceStore, Result as StoreResult, StoreError,
        StoreOp, SubscriptionStore,
    };
    use fleetsub_types::{Channel, Deployable, Placement, Subscription};
    use std::sync::Arc;
    use std::time::Duration;

    fn scheduler(store: Arc<InMemoryResourceStore>, config: SchedulerConfig) -> Scheduler {
        let reconciler = SubscriptionReconciler::new(
            store,
            &HubConfig::default(),
            Arc::new(BroadcastEventRecorder::new(16)),
        );
        Scheduler::new(config, reconciler)
    }

    async fn seeded() -> Arc<InMemoryResourceStore> {
        let store = Arc::new(InMemoryResourceStore::new());
        store
            .create_deployable(&Deployable::new("catalog", "nginx"))
            .await
            .unwrap();
        for name in ["web", "api"] {
            let mut sub = Subscription::new("team-a", name);
            sub.spec.channel = "catalog/dev".into();
            sub.spec.placement = Some(Placement::local());
            store.create_subscription(&sub).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_pass_settles_every_subscription() {
        let store = seeded().await;
        let summary = scheduler(store.clone(), SchedulerConfig::default())
            .run_pass()
            .await
            .unwrap();

        assert_eq!(summary.subscriptions, 2);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.unsettled, 0);
        for name in ["web-deployable", "api-deployable"] {
            assert!(store
                .get_deployable(&ObjectKey::new("team-a", name))
                .await
                .is_ok());
        }

        store.clear_journal().await;
        let again = scheduler(store.clone(), SchedulerConfig::default())
            .run_pass()
            .await
            .unwrap();
        assert_eq!(again.cycles, 2);
        assert!(store.mutations().await.is_empty());
    }

    #[tokio::test]
    async fn test_cycle_budget_leaves_unsettled() {
        let store = seeded().await;
        let config = SchedulerConfig {
            max_cycles_per_pass: 1,
            max_concurrent_reconciliations: 1,
            ..Default::default()
        };
        let summary = scheduler(store, config).run_pass().await.unwrap();
        assert_eq!(summary.cycles, 2);
        assert_eq!(summary.unsettled, 2);
    }

    #[tokio::test]
    async fn test_failed_cycle_is_counted() {
        let store = seeded().await;
        store
            .fail_next(StoreOp::Update, "Subscription", StoreError::Transport("reset".into()))
            .await;
        let config = SchedulerConfig {
            max_concurrent_reconciliations: 1,
            ..Default::default()
        };
        let summary = scheduler(store, config).run_pass().await.unwrap();
        assert_eq!(summary.failed, 1);
    }

    /// Store whose deployable reads never complete
    struct StalledStore(InMemoryResourceStore);

    #[async_trait]
    impl SubscriptionStore for StalledStore {
        async fn get_subscription(&self, key: &ObjectKey) -> StoreResult<Subscription> {
            self.0.get_subscription(key).await
        }
        async fn list_subscriptions(&self, opts: &ListOptions) -> StoreResult<Vec<Subscription>> {
            self.0.list_subscriptions(opts).await
        }
        async fn create_subscription(&self, sub: &Subscription) -> StoreResult<Subscription> {
            self.0.create_subscription(sub).await
        }
        async fn update_subscription(&self, sub: &Subscription) -> StoreResult<Subscription> {
            self.0.update_subscription(sub).await
        }
        async fn update_subscription_status(
            &self,
            sub: &Subscription,
        ) -> StoreResult<Subscription> {
            self.0.update_subscription_status(sub).await
        }
        async fn delete_subscription(&self, key: &ObjectKey) -> StoreResult<()> {
            self.0.delete_subscription(key).await
        }
    }

    #[async_trait]
    impl DeployableStore for StalledStore {
        async fn get_deployable(&self, _key: &ObjectKey) -> StoreResult<Deployable> {
            std::future::pending().await
        }
        async fn list_deployables(&self, opts: &ListOptions) -> StoreResult<Vec<Deployable>> {
            self.0.list_deployables(opts).await
        }
        async fn create_deployable(&self, dpl: &Deployable) -> StoreResult<Deployable> {
            self.0.create_deployable(dpl).await
        }
        async fn update_deployable(&self, dpl: &Deployable) -> StoreResult<Deployable> {
            self.0.update_deployable(dpl).await
        }
        async fn update_deployable_status(&self, dpl: &Deployable) -> StoreResult<Deployable> {
            self.0.update_deployable_status(dpl).await
        }
        async fn delete_deployable(&self, key: &ObjectKey) -> StoreResult<()> {
            self.0.delete_deployable(key).await
        }
    }

    #[async_trait]
    impl ChannelStore for StalledStore {
        async fn get_channel(&self, key: &ObjectKey) -> StoreResult<Channel> {
            self.0.get_channel(key).await
        }
        async fn list_channels(&self, opts: &ListOptions) -> StoreResult<Vec<Channel>> {
            self.0.list_channels(opts).await
        }
        async fn create_channel(&self, channel: &Channel) -> StoreResult<Channel> {
            self.0.create_channel(channel).await
        }
        async fn delete_channel(&self, key: &ObjectKey) -> StoreResult<()> {
            self.0.delete_channel(key).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_in_flight_pass() {
        let inner = InMemoryResourceStore::new();
        let mut sub = Subscription::new("team-a", "web");
        sub.spec.channel = "catalog/dev".into();
        sub.spec.placement = Some(Placement::local());
        inner.create_subscription(&sub).await.unwrap();

        let hub = HubConfig {
            api_timeout_secs: 86_400,
            ..Default::default()
        };
        let reconciler = SubscriptionReconciler::new(
            Arc::new(StalledStore(inner)),
            &hub,
            Arc::new(BroadcastEventRecorder::new(16)),
        );
        let scheduler = Scheduler::new(SchedulerConfig::default(), reconciler);
        let token = scheduler.cancel_token();

        let started = tokio::time::Instant::now();
        scheduler
            .run(tokio::time::sleep(Duration::from_secs(5)))
            .await;
        assert!(token.is_cancelled());
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let store = seeded().await;
        let scheduler = scheduler(store, SchedulerConfig::default());
        let token = scheduler.cancel_token();

        scheduler
            .run(tokio::time::sleep(Duration::from_secs(25)))
            .await;
        assert!(token.is_cancelled());
    }
}
