//! Resource API store traits
//!
//! The hub talks to the API layer only through these traits. Writes are
//! version-stamped: an update carrying a stale `resource_version` fails with
//! [`StoreError::Conflict`](crate::StoreError::Conflict) and the caller is
//! expected to re-run from a fresh read.

use crate::error::Result;
use async_trait::async_trait;
use fleetsub_types::{Channel, Deployable, ObjectKey, Selector, Subscription};

/// Filters for list calls
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Restrict to one namespace; `None` lists across namespaces
    pub namespace: Option<String>,

    /// Only objects whose labels match
    pub selector: Option<Selector>,
}

impl ListOptions {
    pub fn in_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            selector: None,
        }
    }

    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.selector = Some(selector);
        self
    }
}

/// Storage for subscriptions
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn get_subscription(&self, key: &ObjectKey) -> Result<Subscription>;

    async fn list_subscriptions(&self, opts: &ListOptions) -> Result<Vec<Subscription>>;

    async fn create_subscription(&self, sub: &Subscription) -> Result<Subscription>;

    /// Write metadata and spec; status is left as stored
    async fn update_subscription(&self, sub: &Subscription) -> Result<Subscription>;

    /// Write the status sub-resource only
    async fn update_subscription_status(&self, sub: &Subscription) -> Result<Subscription>;

    async fn delete_subscription(&self, key: &ObjectKey) -> Result<()>;
}

/// Storage for deployables
#[async_trait]
pub trait DeployableStore: Send + Sync {
    async fn get_deployable(&self, key: &ObjectKey) -> Result<Deployable>;

    async fn list_deployables(&self, opts: &ListOptions) -> Result<Vec<Deployable>>;

    async fn create_deployable(&self, dpl: &Deployable) -> Result<Deployable>;

    /// Write metadata and spec; status is left as stored
    async fn update_deployable(&self, dpl: &Deployable) -> Result<Deployable>;

    /// Write the status sub-resource only
    async fn update_deployable_status(&self, dpl: &Deployable) -> Result<Deployable>;

    async fn delete_deployable(&self, key: &ObjectKey) -> Result<()>;
}

/// Storage for channels
#[async_trait]
pub trait ChannelStore: Send + Sync {
    async fn get_channel(&self, key: &ObjectKey) -> Result<Channel>;

    async fn list_channels(&self, opts: &ListOptions) -> Result<Vec<Channel>>;

    async fn create_channel(&self, channel: &Channel) -> Result<Channel>;

    async fn delete_channel(&self, key: &ObjectKey) -> Result<()>;
}

/// Combined resource store
pub trait ResourceStore: SubscriptionStore + DeployableStore + ChannelStore {}

impl<T> ResourceStore for T where T: SubscriptionStore + DeployableStore + ChannelStore {}
