//! Resource snapshots
//!
//! A snapshot is a flat document of channels, subscriptions and deployables.
//! The daemon seeds its store from one and can write the reconciled state
//! back out. Input may be YAML or JSON; output is JSON.

use crate::error::SnapshotError;
use crate::traits::ResourceStore;
use fleetsub_types::{Channel, Deployable, Subscription};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    #[serde(default)]
    pub channels: Vec<Channel>,

    #[serde(default)]
    pub subscriptions: Vec<Subscription>,

    #[serde(default)]
    pub deployables: Vec<Deployable>,
}

impl ResourceSnapshot {
    /// Parse a YAML or JSON document
    pub fn parse(content: &str) -> Result<Self, SnapshotError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty() && self.subscriptions.is_empty() && self.deployables.is_empty()
    }

    /// Create every object in `store`; channels first, deployables last so
    /// owner references resolve against already-created subscriptions
    pub async fn load_into(&self, store: &dyn ResourceStore) -> Result<(), SnapshotError> {
        for channel in &self.channels {
            store.create_channel(channel).await?;
        }
        for sub in &self.subscriptions {
            store.create_subscription(sub).await?;
        }
        for dpl in &self.deployables {
            store.create_deployable(dpl).await?;
        }

        info!(
            channels = self.channels.len(),
            subscriptions = self.subscriptions.len(),
            deployables = self.deployables.len(),
            "Snapshot loaded"
        );
        Ok(())
    }
}
