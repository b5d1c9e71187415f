//! Full configuration validation.
//!
//! Validates numeric ranges, cross-field timing constraints, and the store
//! URL format. Each domain has its own submodule; this orchestrator calls
//! them all and collects errors into a single `ConfigError`.

mod helpers;
mod presence;
mod store;


use crate::schema::ViewcountConfig;
use viewcount_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &ViewcountConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    store::validate_store(&mut errors, config);
    presence::validate_presence(&mut errors, config);
    presence::validate_sweeper(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

/// Require a store URL, for commands that talk to the store.
pub fn require_store_url(config: &ViewcountConfig) -> Result<(), ConfigError> {
    if config.store.url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "store.url is not configured (set it in config.toml or VIEWCOUNT_STORE_URL)".into(),
        ));
    }
    Ok(())
}
