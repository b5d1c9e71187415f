//! Configuration and state types for the presence client.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a [`ViewerTracker`](super::ViewerTracker).
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Renewal period for the session's presence record.
    pub heartbeat_interval: Duration,
    /// A record not renewed for this long is no longer live.
    pub stale_threshold: Duration,
    /// Fixed delay between live-update reconnect attempts.
    pub reconnect_delay: Duration,
    /// Count only records renewed within `stale_threshold`. When false, every
    /// record for the url counts and the sweeper bounds the overcount.
    pub live_filter: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
            stale_threshold: Duration::from_secs(120),
            reconnect_delay: Duration::from_secs(5),
            live_filter: true,
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Per-session heartbeat lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeartbeatState {
    #[default]
    Unregistered,
    Registering,
    Active,
    Renewing,
}

impl HeartbeatState {
    /// True while the session holds a record that is being renewed.
    pub fn is_registered(&self) -> bool {
        matches!(self, HeartbeatState::Active | HeartbeatState::Renewing)
    }
}
