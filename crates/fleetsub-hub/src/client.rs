//! Bounded API client
//!
//! Wraps the injected resource store so that every call of a cycle is
//! bounded by the configured timeout and aborted when the cycle's
//! cancellation token fires.

use fleetsub_store::{ListOptions, ResourceStore, Result as StoreResult, StoreError};
use fleetsub_types::{Channel, Deployable, ObjectKey, Resource, Subscription};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Resource store handle scoped to one cycle
#[derive(Clone)]
pub struct ApiClient {
    store: Arc<dyn ResourceStore>,
    timeout: Duration,
    cancel: CancellationToken,
}

impl ApiClient {
    pub fn new(store: Arc<dyn ResourceStore>, timeout: Duration) -> Self {
        Self {
            store,
            timeout,
            cancel: CancellationToken::new(),
        }
    }

    /// Same store and timeout, aborted by `cancel`
    pub fn with_cancel(&self, cancel: CancellationToken) -> Self {
        Self {
            store: Arc::clone(&self.store),
            timeout: self.timeout,
            cancel,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn bounded<T>(
        &self,
        operation: impl Fn() -> String,
        call: impl Future<Output = StoreResult<T>>,
    ) -> StoreResult<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(StoreError::Cancelled {
                operation: operation(),
            }),
            outcome = tokio::time::timeout(self.timeout, call) => match outcome {
                Ok(result) => result,
                Err(_) => Err(StoreError::Timeout {
                    operation: operation(),
                    timeout: self.timeout,
                }),
            },
        }
    }

    pub async fn get_subscription(&self, key: &ObjectKey) -> StoreResult<Subscription> {
        self.bounded(
            || format!("get {} {key}", Subscription::KIND),
            self.store.get_subscription(key),
        )
        .await
    }

    pub async fn list_subscriptions(&self, opts: &ListOptions) -> StoreResult<Vec<Subscription>> {
        self.bounded(
            || format!("list {}", Subscription::KIND),
            self.store.list_subscriptions(opts),
        )
        .await
    }

    pub async fn update_subscription(&self, sub: &Subscription) -> StoreResult<Subscription> {
        self.bounded(
            || format!("update {} {}", Subscription::KIND, sub.key()),
            self.store.update_subscription(sub),
        )
        .await
    }

    pub async fn update_subscription_status(
        &self,
        sub: &Subscription,
    ) -> StoreResult<Subscription> {
        self.bounded(
            || format!("update status of {} {}", Subscription::KIND, sub.key()),
            self.store.update_subscription_status(sub),
        )
        .await
    }

    pub async fn get_deployable(&self, key: &ObjectKey) -> StoreResult<Deployable> {
        self.bounded(
            || format!("get {} {key}", Deployable::KIND),
            self.store.get_deployable(key),
        )
        .await
    }

    pub async fn list_deployables(&self, opts: &ListOptions) -> StoreResult<Vec<Deployable>> {
        self.bounded(
            || format!("list {}", Deployable::KIND),
            self.store.list_deployables(opts),
        )
        .await
    }

    pub async fn create_deployable(&self, dpl: &Deployable) -> StoreResult<Deployable> {
        self.bounded(
            || format!("create {} {}", Deployable::KIND, dpl.key()),
            self.store.create_deployable(dpl),
        )
        .await
    }

    pub async fn update_deployable(&self, dpl: &Deployable) -> StoreResult<Deployable> {
        self.bounded(
            || format!("update {} {}", Deployable::KIND, dpl.key()),
            self.store.update_deployable(dpl),
        )
        .await
    }

    pub async fn delete_deployable(&self, key: &ObjectKey) -> StoreResult<()> {
        self.bounded(
            || format!("delete {} {key}", Deployable::KIND),
            self.store.delete_deployable(key),
        )
        .await
    }

    pub async fn get_channel(&self, key: &ObjectKey) -> StoreResult<Channel> {
        self.bounded(
            || format!("get {} {key}", Channel::KIND),
            self.store.get_channel(key),
        )
        .await
    }
}
