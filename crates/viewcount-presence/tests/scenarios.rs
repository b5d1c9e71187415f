//! End-to-end presence scenarios against the in-process store and hub.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use viewcount_presence::{
    ConnectionState, CronTrigger, HeartbeatState, ManualClock, MemoryHub, MemoryStore, PageUrl,
    Sweeper, TrackerConfig, ViewerTracker,
};

struct World {
    clock: Arc<ManualClock>,
    hub: MemoryHub,
    store: Arc<MemoryStore>,
}

impl World {
    fn new() -> Self {
        let clock = Arc::new(ManualClock::starting_now());
        let hub = MemoryHub::new();
        let store = Arc::new(MemoryStore::new(clock.clone()).with_hub(hub.clone()));
        Self { clock, hub, store }
    }

    fn viewer(&self, url: &str, session: &str) -> ViewerTracker {
        self.viewer_with(url, session, TrackerConfig::default())
    }

    fn viewer_with(&self, url: &str, session: &str, config: TrackerConfig) -> ViewerTracker {
        ViewerTracker::new(
            &PageUrl::parse(url).unwrap(),
            session,
            self.store.clone(),
            Arc::new(self.hub.clone()),
            self.clock.clone(),
            config,
        )
    }

    fn sweeper(&self) -> Sweeper {
        Sweeper::new(self.store.clone(), self.clock.clone(), Duration::from_secs(120))
    }

    /// Move both the wall clock and tokio time, letting timers fire.
    async fn pass(&self, total: Duration) {
        let step = Duration::from_secs(1);
        let mut elapsed = Duration::ZERO;
        while elapsed < total {
            self.clock.advance(step);
            tokio::time::sleep(step).await;
            elapsed += step;
        }
    }
}

/// Let background tasks drain their queues.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test(start_paused = true)]
async fn two_viewers_then_one_leaves_then_rejoin() {
    let world = World::new();
    let s1 = world.viewer("https://x/a", "s1");
    let s2 = world.viewer("https://x/a", "s2");

    s1.start().await;
    settle().await;
    s2.start().await;
    settle().await;
    assert_eq!(s1.get_count(), 2);
    assert_eq!(s2.get_count(), 2);

    // s1 stops heartbeating; s2 keeps renewing.
    s1.stop();
    world.pass(Duration::from_secs(130)).await;
    let outcome = world.sweeper().sweep_once().await.unwrap();
    assert_eq!(outcome.removed, 1);
    settle().await;
    assert_eq!(s2.get_count(), 1);
    assert_eq!(world.store.len().await, 1);

    // Unregister and immediately re-register within the window.
    s2.stop();
    assert_eq!(s2.heartbeat_state(), HeartbeatState::Unregistered);
    s2.register().await.unwrap();
    assert_eq!(s2.fetch_viewer_count().await.unwrap(), 1);
    assert_eq!(world.store.len().await, 1);
}

#[tokio::test(start_paused = true)]
async fn repeated_register_never_duplicates() {
    let world = World::new();
    let viewer = world.viewer("https://x/a", "s1");
    viewer.start().await;

    for _ in 0..5 {
        viewer.register().await.unwrap();
    }
    assert_eq!(world.store.len().await, 1);
    assert_eq!(viewer.fetch_viewer_count().await.unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn fragment_and_trailing_slash_share_a_bucket() {
    let world = World::new();
    let a = world.viewer("https://x/a/#frag", "s1");
    let b = world.viewer("https://x/a", "s2");
    let c = world.viewer("https://x/a/", "s3");

    for viewer in [&a, &b, &c] {
        viewer.start().await;
        settle().await;
    }
    for viewer in [&a, &b, &c] {
        assert_eq!(viewer.get_count(), 3);
    }

    let other = world.viewer("https://x/b", "s4");
    other.start().await;
    settle().await;
    assert_eq!(other.get_count(), 1);
    assert_eq!(a.get_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn heartbeat_keeps_record_alive_across_sweeps() {
    let world = World::new();
    let viewer = world.viewer("https://x/a", "s1");
    viewer.start().await;

    let sweeper = world.sweeper();
    for _ in 0..6 {
        world.pass(Duration::from_secs(60)).await;
        assert_eq!(sweeper.sweep_once().await.unwrap().removed, 0);
    }
    assert_eq!(viewer.fetch_viewer_count().await.unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn sweep_bounded_count_decrements_exactly_once() {
    let world = World::new();
    let unfiltered = TrackerConfig {
        live_filter: false,
        ..TrackerConfig::default()
    };
    let a = world.viewer_with("https://x/a", "a", unfiltered.clone());
    let b = world.viewer_with("https://x/a", "b", unfiltered);

    a.start().await;
    settle().await;
    b.start().await;
    settle().await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    b.on_count_change(move |count| sink.lock().unwrap().push(count));

    let sweeper = Arc::new(world.sweeper());
    let cron = sweeper.spawn(CronTrigger::every("sweep", Duration::from_secs(60)));

    a.stop();
    // Past the threshold plus one sweep interval.
    world.pass(Duration::from_secs(190)).await;
    settle().await;
    cron.abort();

    assert_eq!(b.get_count(), 1);
    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.first(), Some(&2));
    assert!(seen.iter().all(|&count| count == 1 || count == 2));
    let drops = seen.windows(2).filter(|w| w[0] == 2 && w[1] == 1).count();
    assert_eq!(drops, 1);
}

#[tokio::test(start_paused = true)]
async fn failed_count_fetch_keeps_last_count() {
    let world = World::new();
    let viewer = world.viewer("https://x/a", "s1");
    viewer.start().await;
    assert_eq!(viewer.get_count(), 1);

    world.store.set_offline(true);
    assert!(viewer.fetch_viewer_count().await.is_err());
    assert_eq!(viewer.get_count(), 1);

    // Heartbeats keep failing quietly while the store is down.
    world.pass(Duration::from_secs(35)).await;
    assert_eq!(viewer.heartbeat_state(), HeartbeatState::Active);
    world.store.set_offline(false);
}

#[tokio::test(start_paused = true)]
async fn subscription_reconnects_and_catches_up() {
    let world = World::new();
    let watcher = world.viewer("https://x/a", "s1");
    watcher.start().await;
    settle().await;
    assert_eq!(watcher.connection_state(), ConnectionState::Connected);

    world.hub.drop_connections();
    settle().await;
    assert_ne!(watcher.connection_state(), ConnectionState::Connected);

    // A change while disconnected is missed by the watcher.
    let late = world.viewer("https://x/a", "s2");
    late.start().await;
    settle().await;
    assert_eq!(watcher.get_count(), 1);

    // Fixed 5s backoff, then the reconnect refetches.
    tokio::time::sleep(Duration::from_secs(5)).await;
    settle().await;
    assert_eq!(watcher.connection_state(), ConnectionState::Connected);
    assert_eq!(watcher.get_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn first_sweep_before_any_registration_is_quiet() {
    let clock = Arc::new(ManualClock::starting_now());
    let store = Arc::new(MemoryStore::unprovisioned(clock.clone()));
    let sweeper = Sweeper::new(store.clone(), clock, Duration::from_secs(120));

    assert_eq!(sweeper.sweep_once().await.unwrap().removed, 0);
    assert_eq!(sweeper.tick().await.map(|o| o.removed), Some(0));
}
