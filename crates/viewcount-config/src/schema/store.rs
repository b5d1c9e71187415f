//! Presence store endpoint configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Where presence records live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base URL of the record store (e.g. `https://viewers.fly.dev`).
    pub url: String,
    /// Name of the collection holding presence records.
    pub collection: String,
    /// Per-request timeout in milliseconds (valid range: 100-120000).
    pub request_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            collection: "viewers".into(),
            request_timeout_ms: 10_000,
        }
    }
}

impl StoreConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}
