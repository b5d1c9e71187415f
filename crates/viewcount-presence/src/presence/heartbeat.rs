//! Register-or-renew lifecycle for one session's presence record.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use viewcount_common::{PresenceError, RecordId, StoreError};

use crate::store::{
    NewPresence, PresenceFilter, PresencePatch, PresenceQuery, PresenceRecord, PresenceStore,
    SortOrder,
};

use super::types::HeartbeatState;

struct HeartbeatInner {
    store: Arc<dyn PresenceStore>,
    url: String,
    session_id: String,
    state: Mutex<HeartbeatState>,
    record_id: Mutex<Option<RecordId>>,
    /// Bumped by `unregister` while holding the state lock. Store calls
    /// started under an older generation must not publish their result.
    generation: AtomicU64,
}

impl HeartbeatInner {
    fn state(&self) -> MutexGuard<'_, HeartbeatState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record_id(&self) -> MutexGuard<'_, Option<RecordId>> {
        self.record_id.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation
    }

    /// This session's record for this url, if any. Not live-filtered: a
    /// record that went stale but survived the sweeper is still ours to renew.
    async fn lookup(&self) -> Result<Option<PresenceRecord>, StoreError> {
        let page = self
            .store
            .query(
                &PresenceQuery::new(PresenceFilter::for_session(&self.url, &self.session_id))
                    .sorted(SortOrder::UpdatedDesc)
                    .paged(1, 1),
            )
            .await?;
        Ok(page.items.into_iter().next())
    }

    /// Insert a fresh record, adopting the existing one if another
    /// registration for the same pair won the race.
    async fn insert(&self) -> Result<PresenceRecord, StoreError> {
        let new = NewPresence {
            url: self.url.clone(),
            session_id: self.session_id.clone(),
        };
        match self.store.insert(&new).await {
            Ok(record) => Ok(record),
            Err(StoreError::Conflict(message)) => {
                debug!(url = %self.url, "Insert conflicted; adopting existing record");
                self.lookup()
                    .await?
                    .ok_or(StoreError::Conflict(message))
            }
            Err(e) => Err(e),
        }
    }

    /// One renewal. Failures are logged and swallowed.
    async fn renew(&self) {
        let generation = self.generation();
        let Some(id) = self.record_id().clone() else {
            return;
        };
        {
            let mut state = self.state();
            if *state == HeartbeatState::Active {
                *state = HeartbeatState::Renewing;
            }
        }

        match self
            .store
            .patch(&id, &PresencePatch::touch(&self.session_id))
            .await
        {
            Ok(record) => {
                debug!(url = %self.url, id = %record.id, "Presence renewed");
            }
            Err(StoreError::RecordNotFound(_)) if !self.is_current(generation) => {
                debug!(url = %self.url, id = %id, "Record gone after unregister; not re-inserting");
            }
            Err(StoreError::RecordNotFound(_)) => {
                info!(url = %self.url, id = %id, "Presence record evicted, re-registering");
                match self.insert().await {
                    Ok(record) => {
                        let _state = self.state();
                        if self.is_current(generation) {
                            *self.record_id() = Some(record.id);
                        } else {
                            debug!(url = %self.url, "Unregistered during re-registration; dropping record");
                        }
                    }
                    Err(e) => warn!(url = %self.url, error = %e, "Re-registration failed"),
                }
            }
            Err(e) => {
                warn!(url = %self.url, id = %id, error = %e, "Heartbeat failed");
            }
        }

        let mut state = self.state();
        if *state == HeartbeatState::Renewing {
            *state = HeartbeatState::Active;
        }
    }
}

/// Owns one session's presence record: registers it, renews it on a fixed
/// interval, and stops renewing on `unregister`.
///
/// Nothing here deletes the record; the sweeper evicts it once renewals stop.
pub struct HeartbeatClient {
    inner: Arc<HeartbeatInner>,
    interval: Duration,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl HeartbeatClient {
    pub fn new(
        store: Arc<dyn PresenceStore>,
        url: &str,
        session_id: &str,
        interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(HeartbeatInner {
                store,
                url: url.to_string(),
                session_id: session_id.to_string(),
                state: Mutex::new(HeartbeatState::Unregistered),
                record_id: Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
            interval,
            timer: Mutex::new(None),
        }
    }

    pub fn state(&self) -> HeartbeatState {
        *self.inner.state()
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.inner.record_id().clone()
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    /// Register this session, or rejoin its existing record.
    ///
    /// On failure the client stays `Unregistered`; nothing retries until the
    /// next call. An `unregister` that lands while the store call is in
    /// flight wins: the result is dropped and `RegistrationCancelled` returned.
    pub async fn register(&self) -> Result<RecordId, PresenceError> {
        let generation = {
            let mut state = self.inner.state();
            if *state == HeartbeatState::Registering {
                return Err(PresenceError::AlreadyRegistering);
            }
            *state = HeartbeatState::Registering;
            self.inner.generation()
        };
        self.stop_timer();

        let result = match self.inner.lookup().await {
            Ok(Some(existing)) => {
                debug!(url = %self.inner.url, id = %existing.id, "Rejoining existing presence record");
                if self.inner.is_current(generation) {
                    *self.inner.record_id() = Some(existing.id.clone());
                    self.inner.renew().await;
                }
                Ok(self.inner.record_id().clone().unwrap_or(existing.id))
            }
            Ok(None) => self.inner.insert().await.map(|record| record.id),
            Err(e) => Err(e),
        };

        let mut state = self.inner.state();
        if !self.inner.is_current(generation) {
            debug!(url = %self.inner.url, "Registration superseded by unregister");
            return Err(PresenceError::RegistrationCancelled);
        }

        match result {
            Ok(id) => {
                *self.inner.record_id() = Some(id.clone());
                *state = HeartbeatState::Active;
                self.start_timer();
                drop(state);
                info!(
                    url = %self.inner.url,
                    session = %self.inner.session_id,
                    id = %id,
                    "Presence registered"
                );
                Ok(id)
            }
            Err(e) => {
                *state = HeartbeatState::Unregistered;
                *self.inner.record_id() = None;
                drop(state);
                if e.is_collection_missing() {
                    debug!(url = %self.inner.url, error = %e, "Presence collection not ready");
                } else {
                    warn!(url = %self.inner.url, error = %e, "Presence registration failed");
                }
                Err(e.into())
            }
        }
    }

    /// Renew now, outside the timer. Failures are logged and swallowed.
    pub async fn renew(&self) {
        self.inner.renew().await;
    }

    /// A page regaining visibility renews at once, so a backgrounded session
    /// whose timer was throttled does not look absent.
    pub async fn on_visibility_change(&self, visible: bool) {
        if visible && self.state().is_registered() {
            self.inner.renew().await;
        }
    }

    /// Stop renewing. The record is left for the sweeper.
    pub fn unregister(&self) {
        let mut state = self.inner.state();
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        *state = HeartbeatState::Unregistered;
        self.stop_timer();
        if let Some(id) = self.inner.record_id().take() {
            debug!(url = %self.inner.url, id = %id, "Presence unregistered");
        }
    }

    fn start_timer(&self) {
        let inner = Arc::clone(&self.inner);
        let period = self.interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                inner.renew().await;
            }
        });
        if let Some(previous) = self
            .timer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(handle)
        {
            previous.abort();
        }
    }

    fn stop_timer(&self) {
        if let Some(handle) = self.timer.lock().unwrap_or_else(|e| e.into_inner()).take() {
            handle.abort();
        }
    }
}

impl Drop for HeartbeatClient {
    fn drop(&mut self) {
        self.stop_timer();
    }
}
