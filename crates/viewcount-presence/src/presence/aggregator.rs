//! Live viewer count for one url, recomputed on relevant change events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, warn};
use viewcount_common::PresenceError;

use crate::clock::{to_chrono, SharedClock};
use crate::notifier::ChangeEvent;
use crate::store::{PresenceFilter, PresenceStore};

type CountObserver = Box<dyn Fn(u64) + Send + Sync>;

/// Holds the last known count for a url and fans it out to observers.
pub struct CountAggregator {
    store: Arc<dyn PresenceStore>,
    url: String,
    topic: String,
    clock: SharedClock,
    stale_threshold: Duration,
    live_filter: bool,
    count: AtomicU64,
    observers: Mutex<Vec<CountObserver>>,
}

impl CountAggregator {
    pub fn new(
        store: Arc<dyn PresenceStore>,
        url: &str,
        clock: SharedClock,
        stale_threshold: Duration,
        live_filter: bool,
    ) -> Self {
        let topic = store.collection().to_string();
        Self {
            store,
            url: url.to_string(),
            topic,
            clock,
            stale_threshold,
            live_filter,
            count: AtomicU64::new(0),
            observers: Mutex::new(Vec::new()),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Last successfully fetched count.
    pub fn get_count(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }

    /// Register an observer. It is called right away with the current count,
    /// then after every successful fetch.
    ///
    /// Observers run synchronously and must not register further observers.
    pub fn on_count_change(&self, observer: impl Fn(u64) + Send + Sync + 'static) {
        let mut observers = self.observers.lock().unwrap_or_else(|e| e.into_inner());
        observer(self.get_count());
        observers.push(Box::new(observer));
    }

    fn filter(&self) -> PresenceFilter {
        let filter = PresenceFilter::for_url(&self.url);
        if self.live_filter {
            filter.live_after(self.clock.now() - to_chrono(self.stale_threshold))
        } else {
            filter
        }
    }

    /// Recount live records for the url.
    ///
    /// Success replaces the count and notifies every observer, even when the
    /// value is unchanged. Failure keeps the previous count and notifies no one.
    pub async fn fetch_viewer_count(&self) -> Result<u64, PresenceError> {
        match self.store.count(&self.filter()).await {
            Ok(count) => {
                self.count.store(count, Ordering::SeqCst);
                debug!(url = %self.url, count, "Viewer count updated");
                let observers = self.observers.lock().unwrap_or_else(|e| e.into_inner());
                for observer in observers.iter() {
                    observer(count);
                }
                Ok(count)
            }
            Err(e) => {
                if e.is_collection_missing() {
                    debug!(url = %self.url, "Presence collection not ready");
                } else {
                    warn!(url = %self.url, error = %e, "Viewer count fetch failed");
                }
                Err(e.into())
            }
        }
    }

    /// True when `event` concerns this url's presence group.
    pub fn is_relevant(&self, event: &ChangeEvent) -> bool {
        event.topic == self.topic && event.record.url == self.url
    }

    /// Refetch on a relevant change; ignore the rest. Returns whether a
    /// refetch was attempted.
    pub async fn handle_change(&self, event: &ChangeEvent) -> bool {
        if !self.is_relevant(event) {
            return false;
        }
        let _ = self.fetch_viewer_count().await;
        true
    }
}
