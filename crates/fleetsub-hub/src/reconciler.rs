//! Subscription reconciler
//!
//! One cycle per subscription key. The cycle is stateless between runs:
//! everything it needs is read back from the store, so re-running it on an
//! unchanged world issues no writes.

use crate::bookkeeping;
use crate::catalog::ChannelCatalog;
use crate::client::ApiClient;
use crate::config::HubConfig;
use crate::drift::{reconcile_deployable, DriftAction, DriftOutcome};
use crate::error::Result;
use crate::events::EventRecorder;
use crate::rollout::sync_rollout_target;
use crate::status::{update_status, StatusWrite};
use crate::synthesize::synthesize;
use crate::teardown::{teardown, TeardownReport};
use fleetsub_store::{ObjectStore, ResourceStore};
use fleetsub_types::{annotations, ObjectKey, Resource};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// How a cycle ended
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// The subscription no longer exists
    Gone,
    /// The matched-artifact annotation was rewritten; the write triggers
    /// the next cycle
    BookkeepingRefreshed,
    /// Placement was withdrawn
    TornDown(TeardownReport),
    Deployed {
        primary: DriftOutcome,
        target: Option<DriftOutcome>,
        /// `None` when the primary Deployable was just written and carries
        /// no spoke reports yet
        status: Option<StatusWrite>,
    },
}

impl CycleOutcome {
    /// Whether the cycle wrote to the store. A writing cycle is followed
    /// by another one for the same subscription.
    pub fn wrote(&self) -> bool {
        match self {
            CycleOutcome::Gone => false,
            CycleOutcome::BookkeepingRefreshed => true,
            CycleOutcome::TornDown(report) => {
                !report.deleted.is_empty() || report.status_written
            }
            CycleOutcome::Deployed {
                primary,
                target,
                status,
            } => {
                primary.action != DriftAction::InSync
                    || target
                        .as_ref()
                        .is_some_and(|t| t.action != DriftAction::InSync)
                    || matches!(status, Some(StatusWrite::Written))
            }
        }
    }
}

/// Reconciles subscriptions into hub Deployables
#[derive(Clone)]
pub struct SubscriptionReconciler {
    api: ApiClient,
    catalog: ChannelCatalog,
    events: Arc<dyn EventRecorder>,
}

impl SubscriptionReconciler {
    pub fn new(
        store: Arc<dyn ResourceStore>,
        config: &HubConfig,
        events: Arc<dyn EventRecorder>,
    ) -> Self {
        Self {
            api: ApiClient::new(store, config.api_timeout()),
            catalog: ChannelCatalog::new(),
            events,
        }
    }

    /// Read object-bucket channels through `store`
    pub fn with_object_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.catalog = self.catalog.with_object_store(store);
        self
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Run one cycle for the subscription at `key`
    ///
    /// Store calls made by the cycle give up once `cancel` fires.
    #[instrument(skip(self, cancel), fields(subscription = %key))]
    pub async fn reconcile(
        &self,
        key: &ObjectKey,
        cancel: CancellationToken,
    ) -> Result<CycleOutcome> {
        let api = self.api.with_cancel(cancel);

        let sub = match api.get_subscription(key).await {
            Ok(sub) => sub,
            Err(e) if e.is_not_found() => {
                debug!("Subscription is gone");
                return Ok(CycleOutcome::Gone);
            }
            Err(e) => return Err(e.into()),
        };

        if bookkeeping::refresh(&api, &self.catalog, &sub).await? {
            return Ok(CycleOutcome::BookkeepingRefreshed);
        }

        if sub.spec.placement.is_none() {
            let report = teardown(&api, &sub).await?;
            info!(
                deleted = report.deleted.len(),
                status_written = report.status_written,
                "Placement withdrawn"
            );
            return Ok(CycleOutcome::TornDown(report));
        }

        let generation = self.catalog.channel_generation(&api, &sub).await;
        let mut primary = synthesize(&sub, None, generation.as_deref())?;

        let target = sync_rollout_target(&api, &self.catalog, self.events.as_ref(), &sub).await?;
        if let Some(target) = &target {
            primary.metadata.annotations.insert(
                annotations::ROLLING_UPDATE_TARGET.to_string(),
                target.deployable.metadata.name.clone(),
            );
        }

        let primary =
            reconcile_deployable(&api, self.events.as_ref(), &sub.key(), &primary, "Deployable")
                .await?;

        let status = if primary.action == DriftAction::InSync {
            Some(update_status(&api, &sub, &primary.deployable).await?)
        } else {
            None
        };

        Ok(CycleOutcome::Deployed {
            primary,
            target,
            status,
        })
    }
}
