//! Daemon setup and lifecycle management

use crate::catalog::load_buckets;
use crate::config::DaemonConfig;
use crate::error::DaemonResult;
use crate::scheduler::{PassSummary, Scheduler};
use fleetsub_hub::{BroadcastEventRecorder, SubscriptionReconciler};
use fleetsub_store::{InMemoryResourceStore, ResourceSnapshot};
use std::future::Future;
use std::sync::Arc;

/// Fleetsub hub daemon
pub struct Daemon {
    config: DaemonConfig,
    store: Arc<InMemoryResourceStore>,
    scheduler: Scheduler,
}

impl Daemon {
    /// Build the store, catalog and scheduler described by `config`
    pub async fn new(config: DaemonConfig) -> DaemonResult<Self> {
        let store = Arc::new(InMemoryResourceStore::new());

        if let Some(path) = &config.snapshot.path {
            let snapshot = ResourceSnapshot::from_path(path)?;
            snapshot.load_into(store.as_ref()).await?;
            tracing::info!(
                path = %path.display(),
                channels = snapshot.channels.len(),
                subscriptions = snapshot.subscriptions.len(),
                deployables = snapshot.deployables.len(),
                "Loaded resource snapshot"
            );
        }

        let events = Arc::new(BroadcastEventRecorder::new(config.hub.event_channel_capacity));
        let mut reconciler = SubscriptionReconciler::new(store.clone(), &config.hub, events);

        if let Some(dir) = &config.catalog.buckets_dir {
            reconciler = reconciler.with_object_store(Arc::new(load_buckets(dir).await?));
        }

        let scheduler = Scheduler::new(config.scheduler.clone(), reconciler);

        Ok(Self {
            config,
            store,
            scheduler,
        })
    }

    /// Store holding the reconciled resources
    pub fn store(&self) -> &Arc<InMemoryResourceStore> {
        &self.store
    }

    /// Run a single pass, then write the snapshot output if configured
    pub async fn run_once(&self) -> DaemonResult<PassSummary> {
        let summary = self.scheduler.run_pass().await?;
        self.write_output().await?;
        Ok(summary)
    }

    /// Run passes until `shutdown` resolves, then write the snapshot output
    /// if configured
    pub async fn run(&self, shutdown: impl Future<Output = ()>) -> DaemonResult<()> {
        self.scheduler.run(shutdown).await;
        tracing::info!("Fleetsub hub daemon shutting down");
        self.write_output().await
    }

    async fn write_output(&self) -> DaemonResult<()> {
        if let Some(path) = &self.config.snapshot.output {
            self.store.snapshot().await.write_to(path)?;
            tracing::info!(path = %path.display(), "Wrote resource snapshot");
        }
        Ok(())
    }
}

/// Graceful shutdown signal handler
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
