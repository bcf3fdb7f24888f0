//! Channel catalog resolution
//!
//! Turns a subscription's channel reference into the list of candidate
//! artifacts. Namespace channels list Deployables in the channel namespace;
//! object-bucket channels read Deployables out of the bucket when an object
//! store is configured.

use crate::client::ApiClient;
use crate::error::Result;
use fleetsub_store::{ListOptions, ObjectStore};
use fleetsub_types::{
    Channel, ChannelType, Deployable, ObjectKey, Resource, Selector, Subscription,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Where a subscription's channel lives
#[derive(Debug, Clone)]
pub struct ResolvedChannel {
    /// Namespace catalog artifacts are listed in
    pub namespace: String,

    /// Channel object, when the reference resolved and the lookup succeeded
    pub channel: Option<Channel>,
}

impl ResolvedChannel {
    /// Type of the resolved channel, unknown when the lookup failed
    pub fn channel_type(&self) -> Option<ChannelType> {
        self.channel.as_ref().map(|c| c.spec.channel_type)
    }
}

/// Catalog access for subscriptions
#[derive(Clone, Default)]
pub struct ChannelCatalog {
    object_store: Option<Arc<dyn ObjectStore>>,
}

impl ChannelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read object-bucket channels through `store`
    pub fn with_object_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.object_store = Some(store);
        self
    }

    /// Resolve the channel reference of `sub`
    ///
    /// The lookup is best-effort: a failed fetch leaves the type unknown and
    /// the namespace as written in the reference.
    pub async fn resolve(&self, api: &ApiClient, sub: &Subscription) -> ResolvedChannel {
        let namespace = sub.channel_namespace();
        let Some(key) = sub.channel_key() else {
            return ResolvedChannel {
                namespace,
                channel: None,
            };
        };

        let channel = match api.get_channel(&key).await {
            Ok(channel) => Some(channel),
            Err(e) => {
                debug!(subscription = %sub.key(), channel = %key, error = %e, "Channel lookup failed");
                None
            }
        };

        ResolvedChannel { namespace, channel }
    }

    /// Generation of the subscription's channel as a decimal string, if the
    /// channel can be read
    pub async fn channel_generation(&self, api: &ApiClient, sub: &Subscription) -> Option<String> {
        let key = sub.channel_key()?;
        match api.get_channel(&key).await {
            Ok(channel) => Some(channel.metadata.generation.to_string()),
            Err(e) => {
                debug!(subscription = %sub.key(), channel = %key, error = %e, "Channel generation unavailable");
                None
            }
        }
    }

    /// Candidate artifacts of the channel, restricted by `selector`
    pub async fn candidates(
        &self,
        api: &ApiClient,
        resolved: &ResolvedChannel,
        selector: Option<&Selector>,
    ) -> Result<Vec<Deployable>> {
        if let (Some(store), Some(channel)) = (&self.object_store, &resolved.channel) {
            if let Some(bucket) = channel.bucket() {
                return self
                    .bucket_candidates(store.as_ref(), channel, bucket, selector)
                    .await;
            }
        }

        let mut opts = ListOptions::in_namespace(&resolved.namespace);
        if let Some(selector) = selector {
            opts = opts.with_selector(selector.clone());
        }
        Ok(api.list_deployables(&opts).await?)
    }

    async fn bucket_candidates(
        &self,
        store: &dyn ObjectStore,
        channel: &Channel,
        bucket: &str,
        selector: Option<&Selector>,
    ) -> Result<Vec<Deployable>> {
        let mut artifacts = Vec::new();
        for name in store.list(bucket).await? {
            let content = store.get(bucket, &name).await?;
            let mut dpl: Deployable = match serde_yaml::from_slice(&content) {
                Ok(dpl) => dpl,
                Err(e) => {
                    warn!(bucket, object = %name, error = %e, "Skipping undecodable catalog object");
                    continue;
                }
            };

            if dpl.metadata.name.is_empty() {
                dpl.metadata.name = name.clone();
            }
            if dpl.metadata.namespace.is_empty() {
                dpl.metadata.namespace = channel.metadata.namespace.clone();
            }
            if selector.map_or(true, |s| s.matches(&dpl.metadata.labels)) {
                artifacts.push(dpl);
            }
        }

        debug!(
            channel = %ObjectKey::new(&channel.metadata.namespace, &channel.metadata.name),
            bucket,
            found = artifacts.len(),
            "Read bucket catalog"
        );
        Ok(artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetsub_store::{ChannelStore, DeployableStore, InMemoryObjectStore, InMemoryResourceStore};
    use fleetsub_types::LabelSelector;
    use std::time::Duration;

    async fn fixture() -> (Arc<InMemoryResourceStore>, ApiClient) {
        let store = Arc::new(InMemoryResourceStore::new());
        let api = ApiClient::new(store.clone(), Duration::from_secs(5));
        (store, api)
    }

    fn web_selector() -> Selector {
        let mut wire = LabelSelector::default();
        wire.match_labels.insert("app".into(), "web".into());
        Selector::try_from(&wire).unwrap()
    }

    #[tokio::test]
    async fn test_resolve_is_best_effort() {
        let (store, api) = fixture().await;
        let catalog = ChannelCatalog::new();

        let mut sub = Subscription::new("team-a", "s");
        sub.spec.channel = "ch-ns/dev".into();
        let resolved = catalog.resolve(&api, &sub).await;
        assert_eq!(resolved.namespace, "ch-ns");
        assert!(resolved.channel_type().is_none());
        assert_eq!(catalog.channel_generation(&api, &sub).await, None);

        store
            .create_channel(&Channel::new("ch-ns", "dev", ChannelType::Namespace))
            .await
            .unwrap();
        let resolved = catalog.resolve(&api, &sub).await;
        assert_eq!(resolved.channel_type(), Some(ChannelType::Namespace));
        assert_eq!(
            catalog.channel_generation(&api, &sub).await.as_deref(),
            Some("1")
        );
    }

    #[tokio::test]
    async fn test_malformed_reference_namespace() {
        let (_store, api) = fixture().await;
        let catalog = ChannelCatalog::new();
        let mut sub = Subscription::new("team-a", "s");

        sub.spec.channel = "ch-ns/".into();
        let resolved = catalog.resolve(&api, &sub).await;
        assert_eq!(resolved.namespace, "ch-ns");
        assert!(resolved.channel.is_none());

        sub.spec.channel = "a/b/c".into();
        let resolved = catalog.resolve(&api, &sub).await;
        assert_eq!(resolved.namespace, "team-a");
        assert!(resolved.channel.is_none());
    }

    #[tokio::test]
    async fn test_namespace_candidates_use_selector() {
        let (store, api) = fixture().await;
        let mut web = Deployable::new("ch-ns", "web");
        web.metadata.labels.insert("app".into(), "web".into());
        store.create_deployable(&web).await.unwrap();
        store
            .create_deployable(&Deployable::new("ch-ns", "db"))
            .await
            .unwrap();

        let resolved = ResolvedChannel {
            namespace: "ch-ns".into(),
            channel: None,
        };
        let catalog = ChannelCatalog::new();

        let all = catalog.candidates(&api, &resolved, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let selected = catalog
            .candidates(&api, &resolved, Some(&web_selector()))
            .await
            .unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].metadata.name, "web");
    }

    #[tokio::test]
    async fn test_bucket_candidates() {
        let (_store, api) = fixture().await;
        let objects = Arc::new(InMemoryObjectStore::new());
        objects.create("charts").await.unwrap();
        objects
            .put(
                "charts",
                "web",
                br#"{"metadata": {"labels": {"app": "web"}}, "spec": {"template": {"kind": "ConfigMap"}}}"#.to_vec(),
            )
            .await
            .unwrap();
        objects
            .put("charts", "db", b"metadata: {labels: {app: db}}".to_vec())
            .await
            .unwrap();
        objects
            .put("charts", "junk", b"[not, a, deployable".to_vec())
            .await
            .unwrap();

        let mut channel = Channel::new("ch-ns", "bucket", ChannelType::ObjectBucket);
        channel.spec.pathname = "http://minio:9000/charts".into();
        let resolved = ResolvedChannel {
            namespace: "ch-ns".into(),
            channel: Some(channel),
        };
        let catalog = ChannelCatalog::new().with_object_store(objects);

        let all = catalog.candidates(&api, &resolved, None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|d| d.metadata.namespace == "ch-ns"));

        let selected = catalog
            .candidates(&api, &resolved, Some(&web_selector()))
            .await
            .unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].key(), ObjectKey::new("ch-ns", "web"));
    }

    #[tokio::test]
    async fn test_bucket_errors_abort() {
        let (_store, api) = fixture().await;
        let mut channel = Channel::new("ch-ns", "bucket", ChannelType::ObjectBucket);
        channel.spec.pathname = "s3://missing".into();
        let resolved = ResolvedChannel {
            namespace: "ch-ns".into(),
            channel: Some(channel),
        };
        let catalog = ChannelCatalog::new().with_object_store(Arc::new(InMemoryObjectStore::new()));

        assert!(matches!(
            catalog.candidates(&api, &resolved, None).await,
            Err(crate::error::HubError::Catalog(_))
        ));
    }
}
