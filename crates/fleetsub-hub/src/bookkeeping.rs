//! Matched-artifact bookkeeping
//!
//! The subscription carries the set of catalog artifacts its filter
//! currently matches in the `deployables` annotation. A change to that set
//! costs exactly one metadata update, after which the cycle ends; the
//! update itself triggers the next cycle.

use crate::catalog::ChannelCatalog;
use crate::client::ApiClient;
use crate::error::Result;
use crate::filter::ArtifactFilter;
use fleetsub_types::{annotations, DeployableKeySet, Resource, Selector, Subscription};
use tracing::{debug, info, instrument};

/// Keys of every catalog artifact `sub` currently matches
///
/// A malformed label selector or an unreadable catalog aborts the pass.
pub async fn matched_artifacts(
    api: &ApiClient,
    catalog: &ChannelCatalog,
    sub: &Subscription,
) -> Result<DeployableKeySet> {
    let selector = sub
        .spec
        .package_filter
        .as_ref()
        .and_then(|f| f.label_selector.as_ref())
        .map(Selector::try_from)
        .transpose()?;

    let resolved = catalog.resolve(api, sub).await;
    let candidates = catalog.candidates(api, &resolved, selector.as_ref()).await?;

    let filter = ArtifactFilter::for_subscription(sub);
    Ok(candidates
        .iter()
        .filter(|dpl| filter.as_ref().map_or(true, |f| f.matches(dpl)))
        .map(Resource::key)
        .collect())
}

/// Bring the bookkeeping annotation up to date
///
/// Returns `true` when the annotation changed and the subscription was
/// written.
#[instrument(skip_all, fields(subscription = %sub.key()))]
pub async fn refresh(
    api: &ApiClient,
    catalog: &ChannelCatalog,
    sub: &Subscription,
) -> Result<bool> {
    let recorded = DeployableKeySet::parse(
        sub.metadata
            .annotations
            .get(annotations::DEPLOYABLES)
            .map(String::as_str)
            .unwrap_or(""),
    );
    let matched = matched_artifacts(api, catalog, sub).await?;

    if matched == recorded {
        debug!(matched = matched.len(), "Matched artifacts unchanged");
        return Ok(false);
    }

    let mut updated = sub.clone();
    updated
        .metadata
        .annotations
        .insert(annotations::DEPLOYABLES.to_string(), matched.encode());
    api.update_subscription(&updated).await?;

    info!(deployables = %matched, "Matched artifacts changed");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetsub_store::{DeployableStore, InMemoryResourceStore, StoreOp, SubscriptionStore};
    use fleetsub_types::{LabelSelector, LabelSelectorRequirement, ObjectKey, PackageFilter};
    use std::sync::Arc;
    use std::time::Duration;

    async fn setup() -> (Arc<InMemoryResourceStore>, ApiClient, Subscription) {
        let store = Arc::new(InMemoryResourceStore::new());
        let api = ApiClient::new(store.clone(), Duration::from_secs(5));

        for name in ["a", "b"] {
            store
                .create_deployable(&fleetsub_types::Deployable::new("ch-ns", name))
                .await
                .unwrap();
        }

        let mut sub = Subscription::new("team-a", "s");
        sub.spec.channel = "ch-ns/dev".into();
        let sub = store.create_subscription(&sub).await.unwrap();
        (store, api, sub)
    }

    #[tokio::test]
    async fn test_first_refresh_records_matches_once() {
        let (store, api, sub) = setup().await;
        let catalog = ChannelCatalog::new();

        assert!(refresh(&api, &catalog, &sub).await.unwrap());

        let sub = store.get_subscription(&sub.key()).await.unwrap();
        let recorded = DeployableKeySet::parse(&sub.metadata.annotations[annotations::DEPLOYABLES]);
        assert!(recorded.contains("ch-ns/a"));
        assert!(recorded.contains("ch-ns/b"));
        assert_eq!(recorded.len(), 2);

        store.clear_journal().await;
        assert!(!refresh(&api, &catalog, &sub).await.unwrap());
        assert!(store.mutations().await.is_empty());
    }

    #[tokio::test]
    async fn test_order_of_recorded_keys_is_irrelevant() {
        let (store, api, mut sub) = setup().await;
        sub.metadata
            .annotations
            .insert(annotations::DEPLOYABLES.into(), "ch-ns/b,ch-ns/a".into());
        let sub = store.update_subscription(&sub).await.unwrap();

        assert!(!refresh(&api, &ChannelCatalog::new(), &sub).await.unwrap());
    }

    #[tokio::test]
    async fn test_bad_selector_aborts() {
        let (_store, api, mut sub) = setup().await;
        sub.spec.package_filter = Some(PackageFilter {
            label_selector: Some(LabelSelector {
                match_expressions: vec![LabelSelectorRequirement {
                    key: "app".into(),
                    operator: "Near".into(),
                    values: vec![],
                }],
                ..Default::default()
            }),
            ..Default::default()
        });

        let err = refresh(&api, &ChannelCatalog::new(), &sub).await.unwrap_err();
        assert!(matches!(err, crate::error::HubError::Selector(_)));
    }

    #[tokio::test]
    async fn test_update_failure_propagates() {
        let (store, api, sub) = setup().await;
        store
            .fail_next(
                StoreOp::Update,
                "Subscription",
                fleetsub_store::StoreError::Transport("reset".into()),
            )
            .await;

        assert!(refresh(&api, &ChannelCatalog::new(), &sub).await.is_err());
        let stored = store.get_subscription(&ObjectKey::new("team-a", "s")).await.unwrap();
        assert!(!stored.metadata.annotations.contains_key(annotations::DEPLOYABLES));
    }
}
