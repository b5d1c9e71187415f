//! Store endpoint validation (url scheme, collection name, timeout).

use crate::schema::ViewcountConfig;

use super::helpers::validate_range;

pub(crate) fn validate_store(errors: &mut Vec<String>, config: &ViewcountConfig) {
    let url = config.store.url.trim();
    if !url.is_empty() && !(url.starts_with("http://") || url.starts_with("https://")) {
        errors.push(format!("store.url = {url:?} must start with http:// or https://"));
    }

    let collection = &config.store.collection;
    if collection.is_empty()
        || !collection
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        errors.push(format!(
            "store.collection = {collection:?} must be a non-empty identifier"
        ));
    }

    validate_range(
        errors,
        "store.request_timeout_ms",
        config.store.request_timeout_ms,
        100,
        120_000,
    );
}
