//! Configuration, change payloads, and event enums for the change notifier.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::store::PresenceRecord;
use crate::PRESENCE_COLLECTION;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a change subscription.
#[derive(Debug, Clone)]
pub struct SubscriptionConfig {
    /// Topics (collections) to receive change events for.
    pub topics: Vec<String>,
    /// Fixed delay between reconnect attempts. Retries are unbounded.
    pub reconnect_delay: Duration,
    /// How long a single connect attempt may take.
    pub connect_timeout: Duration,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            topics: vec![PRESENCE_COLLECTION.to_string()],
            reconnect_delay: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(15),
        }
    }
}

// ---------------------------------------------------------------------------
// Change payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
}

/// A record changed in a topic.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub topic: String,
    pub action: ChangeAction,
    pub record: PresenceRecord,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Raw events produced by a transport connection.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Connection established; the server assigned `client_id`.
    Connect { client_id: String },
    /// A message on `topic`. `data` is `{ "action": ..., "record": {...} }`.
    Message {
        topic: String,
        data: serde_json::Value,
    },
    /// The connection reported an error. The stream may continue or end.
    Error(String),
}

/// Events emitted by a [`ChangeSubscription`](super::ChangeSubscription).
#[derive(Debug, Clone)]
pub enum NotifierEvent {
    /// Connected and subscribed to every configured topic.
    Connected { client_id: String },
    /// A change on a subscribed topic.
    Change(ChangeEvent),
    /// Connection lost. A reconnect is scheduled.
    Disconnected,
    Error(String),
}

/// Reconnect state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}
