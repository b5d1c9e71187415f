//! Reading `config.toml` into a `ViewcountConfig`.

use std::io::ErrorKind;
use std::path::Path;

use tracing::{info, warn};
use viewcount_common::ConfigError;

use super::paths::{create_default_config, default_config_path};
use crate::schema::ViewcountConfig;
use crate::validation;

/// Parse TOML text; missing fields take their serde defaults.
///
/// Range problems are logged, not returned. Callers that need a usable
/// config run `validation::validate` after applying overrides.
pub fn parse_config(content: &str) -> Result<ViewcountConfig, ConfigError> {
    let config: ViewcountConfig = toml::from_str(content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;
    if let Err(e) = validation::validate(&config) {
        warn!("config validation warning: {e}");
    }
    Ok(config)
}

/// Load one TOML file. A missing file is `FileNotFound`.
pub fn load_from_path(path: &Path) -> Result<ViewcountConfig, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        Err(e) => {
            return Err(ConfigError::ParseError(format!(
                "failed to read {}: {e}",
                path.display()
            )));
        }
    };
    let config = parse_config(&content)?;
    info!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Load `viewcount/config.toml` from the platform config directory.
///
/// On first run the commented template is written there and then read back,
/// so a fresh install and an untouched template load identically.
pub fn load_default() -> Result<ViewcountConfig, ConfigError> {
    let path = default_config_path()?;
    match load_from_path(&path) {
        Err(ConfigError::FileNotFound(_)) => {
            create_default_config(&path)?;
            load_from_path(&path)
        }
        other => other,
    }
}
