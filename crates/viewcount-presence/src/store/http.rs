//! PocketBase-compatible REST store.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use viewcount_common::{RecordId, StoreError};

use super::filter::PresenceQuery;
use super::types::{NewPresence, PresencePatch, PresenceRecord, RecordPage};
use super::PresenceStore;

/// Presence store backed by a PocketBase collection over HTTP.
pub struct HttpStore {
    http: reqwest::Client,
    base_url: String,
    collection: String,
}

impl HttpStore {
    pub fn new(base_url: &str, collection: &str, timeout: Duration) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Network(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            collection: collection.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn records_path(&self) -> String {
        format!("/api/collections/{}/records", self.collection)
    }

    fn records_url(&self) -> String {
        format!("{}{}", self.base_url, self.records_path())
    }

    /// Turn a non-2xx response into a `StoreError`.
    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_error(&self.collection, status.as_u16(), &body))
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, StoreError> {
        response
            .json()
            .await
            .map_err(|e| StoreError::Parse(e.to_string()))
    }
}

/// Map a PocketBase error body onto the store error taxonomy.
pub(crate) fn classify_error(collection: &str, status: u16, body: &str) -> StoreError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.chars().take(200).collect());

    match status {
        404 if message.to_lowercase().contains("collection") => {
            StoreError::CollectionNotFound(collection.to_string())
        }
        404 => StoreError::RecordNotFound(message),
        400 if body.contains("validation_not_unique") => StoreError::Conflict(message),
        _ => StoreError::Api { status, message },
    }
}

#[async_trait]
impl PresenceStore for HttpStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn insert(&self, record: &NewPresence) -> Result<PresenceRecord, StoreError> {
        let response = self
            .http
            .post(self.records_url())
            .json(record)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        Self::parse(self.check(response).await?).await
    }

    async fn patch(
        &self,
        id: &RecordId,
        patch: &PresencePatch,
    ) -> Result<PresenceRecord, StoreError> {
        let response = self
            .http
            .patch(format!("{}/{}", self.records_url(), id))
            .json(patch)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        Self::parse(self.check(response).await?).await
    }

    async fn query(&self, query: &PresenceQuery) -> Result<RecordPage, StoreError> {
        let mut params: Vec<(&str, String)> = vec![
            ("page", query.page.to_string()),
            ("perPage", query.per_page.to_string()),
        ];
        let filter = query.filter.to_expression();
        if !filter.is_empty() {
            params.push(("filter", filter));
        }
        if let Some(sort) = query.sort.as_param() {
            params.push(("sort", sort.to_string()));
        }

        let response = self
            .http
            .get(self.records_url())
            .query(&params)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        Self::parse(self.check(response).await?).await
    }

    async fn delete_all(&self, records: &[PresenceRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let body = batch_delete_body(&self.records_path(), records);
        debug!(count = records.len(), "Submitting batch delete");

        let response = self
            .http
            .post(format!("{}/api/batch", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        match self.check(response).await {
            Ok(_) => Ok(()),
            Err(e) => {
                let e = classify_batch_error(e, records.len());
                if matches!(e, StoreError::Transaction(_)) {
                    warn!(count = records.len(), error = %e, "Batch delete rejected");
                }
                Err(e)
            }
        }
    }
}

/// A rejected batch becomes `Transaction`. PocketBase ships with batch
/// requests disabled and caps requests per batch, so the message says which
/// settings to check.
pub(crate) fn classify_batch_error(err: StoreError, requested: usize) -> StoreError {
    match err {
        StoreError::Api {
            status: 400 | 403,
            message,
        } => StoreError::Transaction(format!(
            "{message} ({requested} deletes; enable batch requests on the server and keep \
             sweeper.max_batch at or below its max requests per batch)"
        )),
        other => other,
    }
}

/// One transactional batch with a DELETE per record.
pub(crate) fn batch_delete_body(records_path: &str, records: &[PresenceRecord]) -> serde_json::Value {
    let requests: Vec<serde_json::Value> = records
        .iter()
        .map(|r| {
            serde_json::json!({
                "method": "DELETE",
                "url": format!("{records_path}/{}", r.id),
            })
        })
        .collect();
    serde_json::json!({ "requests": requests })
}
