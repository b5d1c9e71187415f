//! Where the config file lives, and writing the first one.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use viewcount_common::ConfigError;

use super::template::default_config_toml;

const APP_DIR: &str = "viewcount";
const CONFIG_FILE: &str = "config.toml";

/// `<config dir>/viewcount/config.toml`, e.g. `~/.config/viewcount/config.toml`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
        .ok_or_else(|| ConfigError::ParseError("could not determine config directory".into()))
}

/// Write the commented template to `path`.
///
/// An existing file is left untouched, so two processes starting at once
/// cannot clobber a config the user has already edited.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    let io_err = |action: &str, e: std::io::Error| {
        ConfigError::ParseError(format!("failed to {action} {}: {e}", path.display()))
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err("create directory for", e))?;
    }

    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            file.write_all(default_config_toml().as_bytes())
                .map_err(|e| io_err("write", e))?;
            info!(path = %path.display(), "Created default config");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            debug!(path = %path.display(), "Config already exists; not overwriting");
            Ok(())
        }
        Err(e) => Err(io_err("create", e)),
    }
}
