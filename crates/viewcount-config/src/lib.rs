//! Viewcount configuration system.
//!
//! Provides TOML-based configuration with environment overrides and
//! full validation. All config sections use sensible defaults so
//! partial configs work out of the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use viewcount_config::{load_config, config_to_json};
//!
//! let config = load_config().expect("failed to load config");
//! let json = config_to_json(&config);
//! println!("{json}");
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    LogLevel, LoggingConfig, PresenceConfig, StoreConfig, SweeperConfig, ViewcountConfig,
    CONFIG_SCHEMA_VERSION,
};

use viewcount_common::ConfigError;

/// Load config from the platform default path.
///
/// Loads `config.toml` from the OS config directory, creates a default
/// if none exists, applies environment overrides, and validates the result.
pub fn load_config() -> Result<ViewcountConfig, ConfigError> {
    let mut config = toml_loader::load_default()?;
    toml_loader::apply_env_overrides(&mut config);
    validation::validate(&config)?;
    Ok(config)
}

/// Load config from an explicit path, applying the same overrides and validation.
pub fn load_config_from(path: &std::path::Path) -> Result<ViewcountConfig, ConfigError> {
    let mut config = toml_loader::load_from_path(path)?;
    toml_loader::apply_env_overrides(&mut config);
    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &ViewcountConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_to_json_contains_all_sections() {
        let config = ViewcountConfig::default();
        let json = config_to_json(&config);
        assert!(json.contains("\"store\""));
        assert!(json.contains("\"presence\""));
        assert!(json.contains("\"sweeper\""));
        assert!(json.contains("\"logging\""));
    }

    #[test]
    fn config_schema_version_is_1() {
        assert_eq!(CONFIG_SCHEMA_VERSION, 1);
    }

    #[test]
    fn load_config_from_missing_path_is_file_not_found() {
        let err = load_config_from(std::path::Path::new("/tmp/viewcount_missing_config.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn default_config_round_trips_through_json() {
        let config = ViewcountConfig::default();
        let json = config_to_json(&config);
        let parsed: ViewcountConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.store.collection, "viewers");
        assert_eq!(parsed.presence.heartbeat_interval_ms, 30_000);
        assert_eq!(parsed.sweeper.interval_secs, 60);
    }
}
