//! Hub engine configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Hub engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Bound on every API store call, in seconds
    #[serde(default = "default_api_timeout_secs")]
    pub api_timeout_secs: u64,

    /// Buffered events per subscriber before the slowest one lags
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            api_timeout_secs: default_api_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

impl HubConfig {
    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }
}

fn default_api_timeout_secs() -> u64 {
    30
}

fn default_event_channel_capacity() -> usize {
    1024
}
