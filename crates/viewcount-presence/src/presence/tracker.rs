//! One viewer of one page: heartbeat, live count, and live updates together.

use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::{debug, info};
use viewcount_common::{PresenceError, RecordId};

use crate::clock::SharedClock;
use crate::identity::PageUrl;
use crate::notifier::{ChangeSubscription, ChangeTransport, ConnectionState, SubscriptionConfig};
use crate::store::PresenceStore;

use super::aggregator::CountAggregator;
use super::event_translator::change_listener;
use super::heartbeat::HeartbeatClient;
use super::types::{HeartbeatState, TrackerConfig};

struct LiveUpdates {
    subscription: ChangeSubscription,
    listener: JoinHandle<()>,
}

/// Tracks this session's presence on a page and keeps the page's viewer
/// count current.
///
/// The heartbeat and count paths work without the live subscription; while it
/// is down the count only refreshes on demand.
pub struct ViewerTracker {
    page_url: PageUrl,
    heartbeat: HeartbeatClient,
    aggregator: Arc<CountAggregator>,
    transport: Arc<dyn ChangeTransport>,
    subscription_config: SubscriptionConfig,
    live: Mutex<Option<LiveUpdates>>,
}

impl ViewerTracker {
    pub fn new(
        page_url: &PageUrl,
        session_id: &str,
        store: Arc<dyn PresenceStore>,
        transport: Arc<dyn ChangeTransport>,
        clock: SharedClock,
        config: TrackerConfig,
    ) -> Self {
        let subscription_config = SubscriptionConfig {
            topics: vec![store.collection().to_string()],
            reconnect_delay: config.reconnect_delay,
            ..SubscriptionConfig::default()
        };
        let heartbeat = HeartbeatClient::new(
            Arc::clone(&store),
            page_url.as_str(),
            session_id,
            config.heartbeat_interval,
        );
        let aggregator = Arc::new(CountAggregator::new(
            store,
            page_url.as_str(),
            clock,
            config.stale_threshold,
            config.live_filter,
        ));

        Self {
            page_url: page_url.clone(),
            heartbeat,
            aggregator,
            transport,
            subscription_config,
            live: Mutex::new(None),
        }
    }

    pub fn page_url(&self) -> &PageUrl {
        &self.page_url
    }

    pub fn session_id(&self) -> &str {
        self.heartbeat.session_id()
    }

    /// Open live updates, register this session, and fetch the first count.
    ///
    /// Registration and fetch failures are logged and leave the tracker
    /// running; a later `register` or `fetch_viewer_count` retries them.
    pub async fn start(&self) {
        self.open_live_updates();
        if let Err(e) = self.heartbeat.register().await {
            debug!(url = %self.page_url, error = %e, "Starting without a presence record");
        }
        let _ = self.aggregator.fetch_viewer_count().await;
        info!(url = %self.page_url, session = %self.session_id(), "Viewer tracking started");
    }

    fn open_live_updates(&self) {
        let mut live = self.live.lock().unwrap_or_else(|e| e.into_inner());
        if live.is_some() {
            return;
        }
        let (subscription, events) = ChangeSubscription::open(
            Arc::clone(&self.transport),
            self.subscription_config.clone(),
        );
        let listener = tokio::spawn(change_listener(events, Arc::clone(&self.aggregator)));
        *live = Some(LiveUpdates {
            subscription,
            listener,
        });
    }

    /// Register (or rejoin) explicitly, e.g. after a failed start.
    pub async fn register(&self) -> Result<RecordId, PresenceError> {
        self.open_live_updates();
        self.heartbeat.register().await
    }

    pub async fn on_visibility_change(&self, visible: bool) {
        self.heartbeat.on_visibility_change(visible).await;
    }

    pub fn on_count_change(&self, observer: impl Fn(u64) + Send + Sync + 'static) {
        self.aggregator.on_count_change(observer);
    }

    pub fn get_count(&self) -> u64 {
        self.aggregator.get_count()
    }

    pub async fn fetch_viewer_count(&self) -> Result<u64, PresenceError> {
        self.aggregator.fetch_viewer_count().await
    }

    pub fn heartbeat_state(&self) -> HeartbeatState {
        self.heartbeat.state()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.live
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map_or(ConnectionState::Disconnected, |live| {
                live.subscription.state()
            })
    }

    /// Stop renewing and close live updates. The record is left to expire.
    pub fn stop(&self) {
        self.heartbeat.unregister();
        if let Some(live) = self.live.lock().unwrap_or_else(|e| e.into_inner()).take() {
            live.subscription.close();
            live.listener.abort();
            debug!(url = %self.page_url, "Viewer tracking stopped");
        }
    }
}

impl Drop for ViewerTracker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::clock::ManualClock;
    use crate::notifier::MemoryHub;
    use crate::store::MemoryStore;

    fn tracker(
        store: &Arc<MemoryStore>,
        hub: &MemoryHub,
        clock: &Arc<ManualClock>,
        session: &str,
    ) -> ViewerTracker {
        ViewerTracker::new(
            &PageUrl::parse("https://x/a/").unwrap(),
            session,
            store.clone(),
            Arc::new(hub.clone()),
            clock.clone(),
            TrackerConfig::default(),
        )
    }

    #[tokio::test]
    async fn start_registers_and_counts_self() {
        let clock = Arc::new(ManualClock::starting_now());
        let hub = MemoryHub::new();
        let store = Arc::new(MemoryStore::new(clock.clone()).with_hub(hub.clone()));

        let viewer = tracker(&store, &hub, &clock, "s1");
        viewer.start().await;

        assert_eq!(viewer.heartbeat_state(), HeartbeatState::Active);
        assert_eq!(viewer.get_count(), 1);
        assert_eq!(viewer.page_url().as_str(), "https://x/a");
    }

    #[tokio::test]
    async fn start_survives_unreachable_store() {
        let clock = Arc::new(ManualClock::starting_now());
        let hub = MemoryHub::new();
        let store = Arc::new(MemoryStore::new(clock.clone()));
        store.set_offline(true);

        let viewer = tracker(&store, &hub, &clock, "s1");
        viewer.start().await;
        assert_eq!(viewer.heartbeat_state(), HeartbeatState::Unregistered);
        assert_eq!(viewer.get_count(), 0);

        store.set_offline(false);
        viewer.register().await.unwrap();
        assert_eq!(viewer.fetch_viewer_count().await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_closes_live_updates() {
        let clock = Arc::new(ManualClock::starting_now());
        let hub = MemoryHub::new();
        let store = Arc::new(MemoryStore::new(clock.clone()).with_hub(hub.clone()));

        let viewer = tracker(&store, &hub, &clock, "s1");
        viewer.start().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(viewer.connection_state(), ConnectionState::Connected);

        viewer.stop();
        assert_eq!(viewer.heartbeat_state(), HeartbeatState::Unregistered);
        assert_eq!(viewer.connection_state(), ConnectionState::Disconnected);
        assert_eq!(store.len().await, 1);
    }
}
