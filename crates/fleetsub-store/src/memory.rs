//! In-memory resource store
//!
//! Behaves like the API layer for everything the hub relies on: server-set
//! UIDs and resource versions, optimistic concurrency on writes, a separate
//! status sub-resource, and owner-reference garbage collection when a
//! subscription is deleted. It also keeps a journal of calls and supports
//! one-shot failure injection so reconciliation behaviour can be asserted.

use crate::error::{Result, StoreError};
use crate::snapshot::ResourceSnapshot;
use crate::traits::{ChannelStore, DeployableStore, ListOptions, SubscriptionStore};
use async_trait::async_trait;
use fleetsub_types::{Channel, Deployable, ObjectKey, Resource, Subscription, Uid};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Store operation, as recorded in the journal and matched by injected faults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Get,
    List,
    Create,
    Update,
    UpdateStatus,
    Delete,
}

impl StoreOp {
    pub fn is_mutation(&self) -> bool {
        !matches!(self, StoreOp::Get | StoreOp::List)
    }
}

/// One call made against the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    pub op: StoreOp,
    pub kind: &'static str,
    pub key: Option<ObjectKey>,
}

struct InjectedFault {
    op: StoreOp,
    kind: &'static str,
    error: StoreError,
}

/// Per-kind hooks the generic collection needs
trait Stored: Resource {
    fn same_spec(&self, other: &Self) -> bool;

    fn copy_status_from(&mut self, other: &Self);
}

impl Stored for Subscription {
    fn same_spec(&self, other: &Self) -> bool {
        self.spec == other.spec
    }

    fn copy_status_from(&mut self, other: &Self) {
        self.status = other.status.clone();
    }
}

impl Stored for Deployable {
    fn same_spec(&self, other: &Self) -> bool {
        self.spec == other.spec
    }

    fn copy_status_from(&mut self, other: &Self) {
        self.status = other.status.clone();
    }
}

impl Stored for Channel {
    fn same_spec(&self, other: &Self) -> bool {
        self.spec == other.spec
    }

    fn copy_status_from(&mut self, _other: &Self) {}
}

struct Collection<R> {
    objects: RwLock<BTreeMap<ObjectKey, R>>,
}

impl<R: Stored> Collection<R> {
    fn new() -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    fn not_found(key: &ObjectKey) -> StoreError {
        StoreError::NotFound {
            kind: R::KIND,
            key: key.clone(),
        }
    }

    async fn get(&self, key: &ObjectKey) -> Result<R> {
        let objects = self.objects.read().await;
        objects.get(key).cloned().ok_or_else(|| Self::not_found(key))
    }

    async fn list(&self, opts: &ListOptions) -> Vec<R> {
        let objects = self.objects.read().await;
        objects
            .values()
            .filter(|o| {
                opts.namespace
                    .as_deref()
                    .map_or(true, |ns| o.meta().namespace == ns)
            })
            .filter(|o| {
                opts.selector
                    .as_ref()
                    .map_or(true, |s| s.matches(&o.meta().labels))
            })
            .cloned()
            .collect()
    }

    async fn create(&self, obj: &R, resource_version: String) -> Result<R> {
        let key = obj.key();
        let mut objects = self.objects.write().await;
        if objects.contains_key(&key) {
            return Err(StoreError::AlreadyExists { kind: R::KIND, key });
        }

        let mut stored = obj.clone();
        let meta = stored.meta_mut();
        if meta.uid.is_empty() {
            meta.uid = Uid::generate();
        }
        if meta.creation_timestamp.is_none() {
            meta.creation_timestamp = Some(chrono::Utc::now());
        }
        if meta.generation == 0 {
            meta.generation = 1;
        }
        meta.resource_version = resource_version;

        objects.insert(key, stored.clone());
        Ok(stored)
    }

    /// Apply a write to an existing object after the concurrency check
    async fn write(
        &self,
        obj: &R,
        resource_version: String,
        merge: impl FnOnce(&R, &R) -> R,
    ) -> Result<R> {
        let key = obj.key();
        let mut objects = self.objects.write().await;
        let current = objects.get(&key).ok_or_else(|| Self::not_found(&key))?;

        let expected = &obj.meta().resource_version;
        if !expected.is_empty() && expected != &current.meta().resource_version {
            return Err(StoreError::Conflict {
                kind: R::KIND,
                key,
                expected: expected.clone(),
                current: current.meta().resource_version.clone(),
            });
        }

        let mut next = merge(current, obj);
        let meta = next.meta_mut();
        meta.uid = current.meta().uid.clone();
        meta.creation_timestamp = current.meta().creation_timestamp;
        meta.resource_version = resource_version;

        objects.insert(key, next.clone());
        Ok(next)
    }

    async fn update(&self, obj: &R, resource_version: String) -> Result<R> {
        self.write(obj, resource_version, |current, incoming| {
            let mut next = incoming.clone();
            next.copy_status_from(current);
            next.meta_mut().generation = if current.same_spec(incoming) {
                current.meta().generation
            } else {
                current.meta().generation + 1
            };
            next
        })
        .await
    }

    async fn update_status(&self, obj: &R, resource_version: String) -> Result<R> {
        self.write(obj, resource_version, |current, incoming| {
            let mut next = current.clone();
            next.copy_status_from(incoming);
            next
        })
        .await
    }

    async fn delete(&self, key: &ObjectKey) -> Result<R> {
        let mut objects = self.objects.write().await;
        objects.remove(key).ok_or_else(|| Self::not_found(key))
    }

    async fn delete_owned_by(&self, uid: &Uid) -> Vec<ObjectKey> {
        let mut objects = self.objects.write().await;
        let owned: Vec<ObjectKey> = objects
            .iter()
            .filter(|(_, o)| o.meta().is_owned_by(uid))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &owned {
            objects.remove(key);
        }
        owned
    }

    async fn all(&self) -> Vec<R> {
        self.objects.read().await.values().cloned().collect()
    }
}

/// In-memory resource store for development and testing
pub struct InMemoryResourceStore {
    subscriptions: Collection<Subscription>,
    deployables: Collection<Deployable>,
    channels: Collection<Channel>,
    resource_version: AtomicU64,
    journal: Mutex<Vec<StoreCall>>,
    faults: Mutex<Vec<InjectedFault>>,
}

impl Default for InMemoryResourceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryResourceStore {
    pub fn new() -> Self {
        Self {
            subscriptions: Collection::new(),
            deployables: Collection::new(),
            channels: Collection::new(),
            resource_version: AtomicU64::new(0),
            journal: Mutex::new(Vec::new()),
            faults: Mutex::new(Vec::new()),
        }
    }

    /// Fail the next `op` on `kind` with `error`
    pub async fn fail_next(&self, op: StoreOp, kind: &'static str, error: StoreError) {
        self.faults.lock().await.push(InjectedFault { op, kind, error });
    }

    /// Every call made so far, in order
    pub async fn calls(&self) -> Vec<StoreCall> {
        self.journal.lock().await.clone()
    }

    /// Mutating calls made so far, in order
    pub async fn mutations(&self) -> Vec<StoreCall> {
        self.journal
            .lock()
            .await
            .iter()
            .filter(|c| c.op.is_mutation())
            .cloned()
            .collect()
    }

    pub async fn clear_journal(&self) {
        self.journal.lock().await.clear();
    }

    /// Copy of everything currently stored
    pub async fn snapshot(&self) -> ResourceSnapshot {
        ResourceSnapshot {
            channels: self.channels.all().await,
            subscriptions: self.subscriptions.all().await,
            deployables: self.deployables.all().await,
        }
    }

    fn next_resource_version(&self) -> String {
        (self.resource_version.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    async fn enter(&self, op: StoreOp, kind: &'static str, key: Option<&ObjectKey>) -> Result<()> {
        self.journal.lock().await.push(StoreCall {
            op,
            kind,
            key: key.cloned(),
        });

        let mut faults = self.faults.lock().await;
        if let Some(pos) = faults.iter().position(|f| f.op == op && f.kind == kind) {
            let fault = faults.remove(pos);
            debug!(?op, kind, error = %fault.error, "Injected store failure");
            return Err(fault.error);
        }
        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for InMemoryResourceStore {
    async fn get_subscription(&self, key: &ObjectKey) -> Result<Subscription> {
        self.enter(StoreOp::Get, Subscription::KIND, Some(key)).await?;
        self.subscriptions.get(key).await
    }

    async fn list_subscriptions(&self, opts: &ListOptions) -> Result<Vec<Subscription>> {
        self.enter(StoreOp::List, Subscription::KIND, None).await?;
        Ok(self.subscriptions.list(opts).await)
    }

    async fn create_subscription(&self, sub: &Subscription) -> Result<Subscription> {
        self.enter(StoreOp::Create, Subscription::KIND, Some(&sub.key()))
            .await?;
        self.subscriptions
            .create(sub, self.next_resource_version())
            .await
    }

    async fn update_subscription(&self, sub: &Subscription) -> Result<Subscription> {
        self.enter(StoreOp::Update, Subscription::KIND, Some(&sub.key()))
            .await?;
        self.subscriptions
            .update(sub, self.next_resource_version())
            .await
    }

    async fn update_subscription_status(&self, sub: &Subscription) -> Result<Subscription> {
        self.enter(StoreOp::UpdateStatus, Subscription::KIND, Some(&sub.key()))
            .await?;
        self.subscriptions
            .update_status(sub, self.next_resource_version())
            .await
    }

    async fn delete_subscription(&self, key: &ObjectKey) -> Result<()> {
        self.enter(StoreOp::Delete, Subscription::KIND, Some(key))
            .await?;
        let removed = self.subscriptions.delete(key).await?;

        let collected = self.deployables.delete_owned_by(removed.uid()).await;
        if !collected.is_empty() {
            debug!(subscription = %key, collected = collected.len(), "Garbage-collected owned deployables");
        }
        Ok(())
    }
}

#[async_trait]
impl DeployableStore for InMemoryResourceStore {
    async fn get_deployable(&self, key: &ObjectKey) -> Result<Deployable> {
        self.enter(StoreOp::Get, Deployable::KIND, Some(key)).await?;
        self.deployables.get(key).await
    }

    async fn list_deployables(&self, opts: &ListOptions) -> Result<Vec<Deployable>> {
        self.enter(StoreOp::List, Deployable::KIND, None).await?;
        Ok(self.deployables.list(opts).await)
    }

    async fn create_deployable(&self, dpl: &Deployable) -> Result<Deployable> {
        self.enter(StoreOp::Create, Deployable::KIND, Some(&dpl.key()))
            .await?;
        self.deployables
            .create(dpl, self.next_resource_version())
            .await
    }

    async fn update_deployable(&self, dpl: &Deployable) -> Result<Deployable> {
        self.enter(StoreOp::Update, Deployable::KIND, Some(&dpl.key()))
            .await?;
        self.deployables
            .update(dpl, self.next_resource_version())
            .await
    }

    async fn update_deployable_status(&self, dpl: &Deployable) -> Result<Deployable> {
        self.enter(StoreOp::UpdateStatus, Deployable::KIND, Some(&dpl.key()))
            .await?;
        self.deployables
            .update_status(dpl, self.next_resource_version())
            .await
    }

    async fn delete_deployable(&self, key: &ObjectKey) -> Result<()> {
        self.enter(StoreOp::Delete, Deployable::KIND, Some(key)).await?;
        self.deployables.delete(key).await.map(|_| ())
    }
}

#[async_trait]
impl ChannelStore for InMemoryResourceStore {
    async fn get_channel(&self, key: &ObjectKey) -> Result<Channel> {
        self.enter(StoreOp::Get, Channel::KIND, Some(key)).await?;
        self.channels.get(key).await
    }

    async fn list_channels(&self, opts: &ListOptions) -> Result<Vec<Channel>> {
        self.enter(StoreOp::List, Channel::KIND, None).await?;
        Ok(self.channels.list(opts).await)
    }

    async fn create_channel(&self, channel: &Channel) -> Result<Channel> {
        self.enter(StoreOp::Create, Channel::KIND, Some(&channel.key()))
            .await?;
        self.channels
            .create(channel, self.next_resource_version())
            .await
    }

    async fn delete_channel(&self, key: &ObjectKey) -> Result<()> {
        self.enter(StoreOp::Delete, Channel::KIND, Some(key)).await?;
        self.channels.delete(key).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetsub_types::{
        DeployablePhase, LabelSelector, OwnerReference, Selector, SubscriptionPhase,
    };

    #[tokio::test]
    async fn test_create_assigns_server_fields() {
        let store = InMemoryResourceStore::new();
        let created = store
            .create_subscription(&Subscription::new("ns", "s"))
            .await
            .unwrap();

        assert!(!created.uid().is_empty());
        assert_eq!(created.metadata.generation, 1);
        assert_eq!(created.metadata.resource_version, "1");
        assert!(created.metadata.creation_timestamp.is_some());

        let err = store
            .create_subscription(&Subscription::new("ns", "s"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_stale_write_conflicts() {
        let store = InMemoryResourceStore::new();
        let created = store
            .create_subscription(&Subscription::new("ns", "s"))
            .await
            .unwrap();

        let mut first = created.clone();
        first.spec.channel = "ch/a".into();
        let updated = store.update_subscription(&first).await.unwrap();
        assert_eq!(updated.metadata.generation, 2);

        let mut stale = created;
        stale.spec.channel = "ch/b".into();
        let err = store.update_subscription(&stale).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_update_and_status_are_separate() {
        let store = InMemoryResourceStore::new();
        let created = store
            .create_subscription(&Subscription::new("ns", "s"))
            .await
            .unwrap();

        let mut with_status = created.clone();
        with_status.status.phase = SubscriptionPhase::Propagated;
        with_status.spec.channel = "ignored/by-status-write".into();
        let after_status = store
            .update_subscription_status(&with_status)
            .await
            .unwrap();
        assert_eq!(after_status.status.phase, SubscriptionPhase::Propagated);
        assert!(after_status.spec.channel.is_empty());

        let mut with_spec = after_status.clone();
        with_spec.status.phase = SubscriptionPhase::Unset;
        with_spec.spec.channel = "ch/a".into();
        let after_spec = store.update_subscription(&with_spec).await.unwrap();
        assert_eq!(after_spec.spec.channel, "ch/a");
        assert_eq!(after_spec.status.phase, SubscriptionPhase::Propagated);
    }

    #[tokio::test]
    async fn test_list_filters_namespace_and_labels() {
        let store = InMemoryResourceStore::new();
        let mut a = Deployable::new("ch", "a");
        a.metadata.labels.insert("app".into(), "web".into());
        let b = Deployable::new("ch", "b");
        let c = Deployable::new("other", "c");
        for d in [&a, &b, &c] {
            store.create_deployable(d).await.unwrap();
        }

        let in_ns = store
            .list_deployables(&ListOptions::in_namespace("ch"))
            .await
            .unwrap();
        assert_eq!(in_ns.len(), 2);

        let mut wire = LabelSelector::default();
        wire.match_labels.insert("app".into(), "web".into());
        let selected = store
            .list_deployables(
                &ListOptions::in_namespace("ch").with_selector(Selector::try_from(&wire).unwrap()),
            )
            .await
            .unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].metadata.name, "a");
    }

    #[tokio::test]
    async fn test_deleting_subscription_collects_owned_deployables() {
        let store = InMemoryResourceStore::new();
        let sub = store
            .create_subscription(&Subscription::new("ns", "s"))
            .await
            .unwrap();

        let mut owned = Deployable::new("ns", "s-deployable");
        owned
            .metadata
            .set_controller(OwnerReference::controller_of(&sub));
        store.create_deployable(&owned).await.unwrap();
        store
            .create_deployable(&Deployable::new("ns", "unrelated"))
            .await
            .unwrap();

        store.delete_subscription(&sub.key()).await.unwrap();

        assert!(store
            .get_deployable(&ObjectKey::new("ns", "s-deployable"))
            .await
            .unwrap_err()
            .is_not_found());
        assert!(store
            .get_deployable(&ObjectKey::new("ns", "unrelated"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_injected_fault_fires_once_and_is_journaled() {
        let store = InMemoryResourceStore::new();
        let created = store
            .create_deployable(&Deployable::new("ns", "d"))
            .await
            .unwrap();
        store.clear_journal().await;

        store
            .fail_next(
                StoreOp::UpdateStatus,
                Deployable::KIND,
                StoreError::Transport("connection reset".into()),
            )
            .await;

        let mut dpl = created.clone();
        dpl.status.phase = DeployablePhase::Deployed;
        assert!(matches!(
            store.update_deployable_status(&dpl).await,
            Err(StoreError::Transport(_))
        ));
        assert!(store.update_deployable_status(&dpl).await.is_ok());

        let mutations = store.mutations().await;
        assert_eq!(mutations.len(), 2);
        assert!(mutations.iter().all(|c| c.op == StoreOp::UpdateStatus));
    }
}
