//! Presence record store contract and its implementations.
//!
//! `MemoryStore` runs in-process (tests, single-host setups); `HttpStore`
//! talks to a PocketBase-compatible REST API.

mod filter;
mod http;
mod memory;
mod types;

pub use filter::{PresenceFilter, PresenceQuery, SortOrder};
pub use http::HttpStore;
pub use memory::MemoryStore;
pub use types::{timestamp, NewPresence, PresencePatch, PresenceRecord, RecordPage};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use viewcount_common::{RecordId, StoreError};

/// Page size used when draining a filtered result set.
pub const FETCH_PAGE_SIZE: u32 = 500;

/// Record store holding one presence record per (url, session_id).
///
/// All mutations are single-row writes keyed by record id, plus the
/// atomic batch delete used by the sweeper.
#[async_trait]
pub trait PresenceStore: Send + Sync {
    /// Collection (and realtime topic) the records live in.
    fn collection(&self) -> &str;

    async fn insert(&self, record: &NewPresence) -> Result<PresenceRecord, StoreError>;

    /// Apply `patch` and stamp the record's `updated` time.
    async fn patch(&self, id: &RecordId, patch: &PresencePatch)
        -> Result<PresenceRecord, StoreError>;

    async fn query(&self, query: &PresenceQuery) -> Result<RecordPage, StoreError>;

    /// Delete every record in one all-or-nothing unit.
    async fn delete_all(&self, records: &[PresenceRecord]) -> Result<(), StoreError>;

    /// Number of records matching `filter`.
    async fn count(&self, filter: &PresenceFilter) -> Result<u64, StoreError> {
        let page = self
            .query(&PresenceQuery::new(filter.clone()).paged(1, 1))
            .await?;
        Ok(page.total_items)
    }

    /// Every record last renewed before `cutoff`, optionally scoped to one url.
    async fn filter_by_threshold(
        &self,
        url: Option<&str>,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<PresenceRecord>, StoreError> {
        let mut filter = PresenceFilter::stale_before(cutoff);
        filter.url = url.map(str::to_string);

        let mut records = Vec::new();
        let mut page = 1;
        loop {
            let result = self
                .query(
                    &PresenceQuery::new(filter.clone())
                        .sorted(SortOrder::UpdatedDesc)
                        .paged(page, FETCH_PAGE_SIZE),
                )
                .await?;
            let fetched = result.items.len();
            records.extend(result.items);
            if fetched < FETCH_PAGE_SIZE as usize || page >= result.total_pages {
                break;
            }
            page += 1;
        }
        Ok(records)
    }
}
