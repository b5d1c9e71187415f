//! Live "who is viewing this page" presence protocol.
//!
//! Each viewer registers a presence record keyed by (url, session_id) and
//! renews it on a heartbeat. A sweeper evicts records that stop renewing,
//! and every viewer recomputes the live count whenever the store reports a
//! change for its url.
//!
//! The record store and the change transport are traits so the protocol
//! runs against a PocketBase-style HTTP backend or fully in-process.

pub mod clock;
pub mod cron;
pub mod identity;
pub mod notifier;
pub mod presence;
pub mod store;
pub mod sweeper;
pub mod widget;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use cron::CronTrigger;
pub use identity::{
    generate_session_token, normalize_url, session_id, FileSessionStorage, MemorySessionStorage,
    PageUrl, SessionStorage, SESSION_KEY,
};
pub use notifier::{
    ChangeAction, ChangeEvent, ChangeSubscription, ChangeTransport, ConnectionState, MemoryHub,
    NotifierEvent, SseTransport, SubscriptionConfig, TransportEvent,
};
pub use presence::{
    CountAggregator, HeartbeatClient, HeartbeatState, TrackerConfig, ViewerTracker,
};
pub use store::{
    HttpStore, MemoryStore, NewPresence, PresenceFilter, PresencePatch, PresenceQuery,
    PresenceRecord, PresenceStore, RecordPage, SortOrder,
};
pub use sweeper::{SweepOutcome, Sweeper};
pub use widget::{attach_renderer, format_viewers, CountRenderer, LogRenderer};

/// Default collection / realtime topic holding presence records.
pub const PRESENCE_COLLECTION: &str = "viewers";
