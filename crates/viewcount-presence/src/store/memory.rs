//! In-process presence store.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use viewcount_common::{RecordId, StoreError};

use crate::clock::SharedClock;
use crate::notifier::{ChangeAction, ChangeEvent, MemoryHub};
use crate::PRESENCE_COLLECTION;

use super::filter::{PresenceQuery, SortOrder};
use super::types::{NewPresence, PresencePatch, PresenceRecord, RecordPage};
use super::PresenceStore;

struct MemoryState {
    provisioned: bool,
    records: Vec<PresenceRecord>,
}

/// Presence store held in memory.
///
/// Enforces one record per (url, session_id), runs `delete_all` under a single
/// write lock, and publishes every mutation to an attached [`MemoryHub`].
pub struct MemoryStore {
    collection: String,
    clock: SharedClock,
    state: RwLock<MemoryState>,
    hub: Option<MemoryHub>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new(clock: SharedClock) -> Self {
        Self::build(clock, true)
    }

    /// A store whose collection does not exist until [`provision`](Self::provision).
    pub fn unprovisioned(clock: SharedClock) -> Self {
        Self::build(clock, false)
    }

    fn build(clock: SharedClock, provisioned: bool) -> Self {
        Self {
            collection: PRESENCE_COLLECTION.to_string(),
            clock,
            state: RwLock::new(MemoryState {
                provisioned,
                records: Vec::new(),
            }),
            hub: None,
            offline: AtomicBool::new(false),
        }
    }

    pub fn with_collection(mut self, collection: &str) -> Self {
        self.collection = collection.to_string();
        self
    }

    /// Publish create/update/delete events to `hub`.
    pub fn with_hub(mut self, hub: MemoryHub) -> Self {
        self.hub = Some(hub);
        self
    }

    pub async fn provision(&self) {
        self.state.write().await.provisioned = true;
    }

    /// While offline every operation fails with a network error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub async fn snapshot(&self) -> Vec<PresenceRecord> {
        self.state.read().await.records.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_reachable(&self, provisioned: bool) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Network("store offline".into()));
        }
        if !provisioned {
            return Err(StoreError::CollectionNotFound(self.collection.clone()));
        }
        Ok(())
    }

    fn publish(&self, action: ChangeAction, record: PresenceRecord) {
        if let Some(hub) = &self.hub {
            hub.publish(ChangeEvent {
                topic: self.collection.clone(),
                action,
                record,
            });
        }
    }
}

#[async_trait]
impl PresenceStore for MemoryStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn insert(&self, record: &NewPresence) -> Result<PresenceRecord, StoreError> {
        let created = {
            let mut state = self.state.write().await;
            self.check_reachable(state.provisioned)?;

            if state
                .records
                .iter()
                .any(|r| r.url == record.url && r.session_id == record.session_id)
            {
                return Err(StoreError::Conflict(format!(
                    "{} already registered for {}",
                    record.session_id, record.url
                )));
            }

            let created = PresenceRecord {
                id: RecordId::new(),
                url: record.url.clone(),
                session_id: record.session_id.clone(),
                updated_at: self.clock.now(),
            };
            state.records.push(created.clone());
            created
        };

        debug!(id = %created.id, url = %created.url, "Presence record created");
        self.publish(ChangeAction::Create, created.clone());
        Ok(created)
    }

    async fn patch(
        &self,
        id: &RecordId,
        patch: &PresencePatch,
    ) -> Result<PresenceRecord, StoreError> {
        let updated = {
            let mut state = self.state.write().await;
            self.check_reachable(state.provisioned)?;

            let record = state
                .records
                .iter_mut()
                .find(|r| &r.id == id)
                .ok_or_else(|| StoreError::RecordNotFound(id.to_string()))?;
            if let Some(url) = &patch.url {
                record.url = url.clone();
            }
            if let Some(session_id) = &patch.session_id {
                record.session_id = session_id.clone();
            }
            record.updated_at = self.clock.now();
            record.clone()
        };

        self.publish(ChangeAction::Update, updated.clone());
        Ok(updated)
    }

    async fn query(&self, query: &PresenceQuery) -> Result<RecordPage, StoreError> {
        let state = self.state.read().await;
        self.check_reachable(state.provisioned)?;

        let mut matched: Vec<PresenceRecord> = state
            .records
            .iter()
            .filter(|r| query.filter.matches(r))
            .cloned()
            .collect();
        drop(state);

        match query.sort {
            SortOrder::Unsorted => {}
            SortOrder::UpdatedAsc => matched.sort_by_key(|r| r.updated_at),
            SortOrder::UpdatedDesc => matched.sort_by(|a, b| b.updated_at.cmp(&a.updated_at)),
        }

        let per_page = query.per_page.max(1);
        let total_items = matched.len() as u64;
        let total_pages = total_items.div_ceil(per_page as u64) as u32;
        let items = matched
            .into_iter()
            .skip((query.page.max(1) as usize - 1) * per_page as usize)
            .take(per_page as usize)
            .collect();

        Ok(RecordPage {
            page: query.page.max(1),
            per_page,
            total_items,
            total_pages,
            items,
        })
    }

    async fn delete_all(&self, records: &[PresenceRecord]) -> Result<(), StoreError> {
        let removed = {
            let mut state = self.state.write().await;
            self.check_reachable(state.provisioned)?;

            if let Some(missing) = records
                .iter()
                .find(|target| !state.records.iter().any(|r| r.id == target.id))
            {
                return Err(StoreError::Transaction(format!(
                    "record {} not found, batch rolled back",
                    missing.id
                )));
            }

            let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut state.records)
                .into_iter()
                .partition(|r| records.iter().any(|target| target.id == r.id));
            state.records = kept;
            removed
        };

        for record in removed {
            self.publish(ChangeAction::Delete, record);
        }
        Ok(())
    }
}
