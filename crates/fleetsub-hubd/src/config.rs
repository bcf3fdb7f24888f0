//! Configuration for fleetsub-hubd

use fleetsub_hub::HubConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Reconciliation engine settings
    #[serde(default)]
    pub hub: HubConfig,

    /// Scheduler configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Resource snapshot in and out
    #[serde(default)]
    pub snapshot: SnapshotConfig,

    /// Object-bucket catalog content
    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Interval between reconciliation passes in seconds
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_secs: u64,

    /// Maximum concurrent reconciliations
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_reconciliations: usize,

    /// Cycles a subscription may run within one pass while its cycles
    /// keep writing
    #[serde(default = "default_max_cycles")]
    pub max_cycles_per_pass: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            reconcile_interval_secs: default_reconcile_interval(),
            max_concurrent_reconciliations: default_max_concurrent(),
            max_cycles_per_pass: default_max_cycles(),
        }
    }
}

impl SchedulerConfig {
    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs.max(1))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Resource snapshot configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// YAML or JSON snapshot loaded into the store at startup
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Where the store is written back after the daemon stops
    #[serde(default)]
    pub output: Option<PathBuf>,
}

/// Object-bucket catalog configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Directory holding one subdirectory per bucket, one file per object
    #[serde(default)]
    pub buckets_dir: Option<PathBuf>,
}

// Default value helpers
fn default_reconcile_interval() -> u64 {
    10
}

fn default_max_concurrent() -> usize {
    10
}

fn default_max_cycles() -> usize {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration from file
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        // Add file configuration if provided
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        // Add environment variables with FLEETSUB_ prefix, e.g.
        // FLEETSUB_SCHEDULER__RECONCILE_INTERVAL_SECS
        builder = builder.add_source(
            config::Environment::with_prefix("FLEETSUB")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
