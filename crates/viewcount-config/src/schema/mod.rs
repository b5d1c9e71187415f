//! Configuration schema types for viewcount.
//!
//! All structs use `serde(default)` so partial configs work correctly.
//! Missing fields are filled with the protocol defaults.

mod presence;
mod store;
mod system;

pub use presence::*;
pub use store::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration.
///
/// Only override what you want to change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct ViewcountConfig {
    pub store: StoreConfig,
    pub presence: PresenceConfig,
    pub sweeper: SweeperConfig,
    pub logging: LoggingConfig,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn default_config_has_correct_store() {
        let config = ViewcountConfig::default();
        assert!(config.store.url.is_empty());
        assert_eq!(config.store.collection, "viewers");
        assert_eq!(config.store.request_timeout_ms, 10_000);
    }

    #[test]
    fn default_config_has_correct_presence() {
        let config = ViewcountConfig::default();
        assert_eq!(config.presence.heartbeat_interval_ms, 30_000);
        assert_eq!(config.presence.stale_threshold_ms, 120_000);
        assert_eq!(config.presence.reconnect_delay_ms, 5_000);
        assert!(config.presence.live_filter);
        assert!(config.presence.session_file.is_none());
    }

    #[test]
    fn presence_duration_accessors() {
        let presence = PresenceConfig::default();
        assert_eq!(presence.heartbeat_interval(), Duration::from_secs(30));
        assert_eq!(presence.stale_threshold(), Duration::from_secs(120));
        assert_eq!(presence.reconnect_delay(), Duration::from_secs(5));
    }

    #[test]
    fn default_config_has_correct_sweeper() {
        let config = ViewcountConfig::default();
        assert!(config.sweeper.enabled);
        assert_eq!(config.sweeper.interval_secs, 60);
        assert_eq!(config.sweeper.interval(), Duration::from_secs(60));
    }

    #[test]
    fn default_config_has_correct_logging() {
        let config = ViewcountConfig::default();
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.logging.level.as_directive(), "info");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: ViewcountConfig = toml::from_str(
            r#"
[presence]
heartbeat_interval_ms = 10000
"#,
        )
        .unwrap();
        assert_eq!(config.presence.heartbeat_interval_ms, 10_000);
        assert_eq!(config.presence.stale_threshold_ms, 120_000);
        assert_eq!(config.store.collection, "viewers");
    }

    #[test]
    fn log_level_parses_lowercase() {
        let config: ViewcountConfig = toml::from_str(
            r#"
[logging]
level = "debug"
"#,
        )
        .unwrap();
        assert_eq!(config.logging.level, LogLevel::Debug);
    }
}
