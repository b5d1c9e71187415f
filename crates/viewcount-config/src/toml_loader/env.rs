//! Environment variable overrides applied after file loading.

use crate::schema::ViewcountConfig;
use tracing::debug;

/// Overrides `store.url` when set and non-empty.
pub const STORE_URL_ENV: &str = "VIEWCOUNT_STORE_URL";

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: &mut ViewcountConfig) {
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

pub(crate) fn apply_overrides_from(
    config: &mut ViewcountConfig,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(url) = lookup(STORE_URL_ENV).filter(|v| !v.trim().is_empty()) {
        debug!("store.url overridden from {STORE_URL_ENV}");
        config.store.url = url.trim().to_string();
    }
}
