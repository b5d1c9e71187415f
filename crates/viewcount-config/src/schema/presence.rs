//! Heartbeat and liveness configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Presence protocol timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    /// Renewal interval in milliseconds.
    pub heartbeat_interval_ms: u64,
    /// Gap since the last renewal after which a session is gone.
    pub stale_threshold_ms: u64,
    /// Fixed delay between live-subscription reconnect attempts.
    pub reconnect_delay_ms: u64,
    /// Count only records renewed within the stale threshold. When false,
    /// every record for the url is counted and the sweeper bounds the overcount.
    pub live_filter: bool,
    /// Optional file persisting the session token across restarts.
    pub session_file: Option<PathBuf>,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: 30_000,
            stale_threshold_ms: 120_000,
            reconnect_delay_ms: 5_000,
            live_filter: true,
            session_file: None,
        }
    }
}

impl PresenceConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn stale_threshold(&self) -> Duration {
        Duration::from_millis(self.stale_threshold_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}
