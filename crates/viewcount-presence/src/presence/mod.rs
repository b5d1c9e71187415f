//! Per-session presence: heartbeat lifecycle and live viewer counts.
//!
//! `HeartbeatClient` keeps one session's record renewed, `CountAggregator`
//! recounts a url's live records, and `ViewerTracker` wires both to a
//! change subscription so counts follow other viewers in near-real-time.

mod aggregator;
mod event_translator;
mod heartbeat;
mod tracker;
mod types;

pub use aggregator::CountAggregator;
pub use heartbeat::HeartbeatClient;
pub use tracker::ViewerTracker;
pub use types::{HeartbeatState, TrackerConfig};
