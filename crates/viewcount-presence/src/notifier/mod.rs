//! Change notifier: delivers "record changed" events for subscribed topics.
//!
//! A [`ChangeTransport`] knows how to open one connection and register topic
//! interest. [`ChangeSubscription`] drives it through the reconnect state
//! machine (`Disconnected -> Connecting -> Connected -> Disconnected`) with a
//! fixed delay between attempts and no retry cap.

mod client;
mod connection;
mod handler;
mod memory;
mod sse;
mod types;

pub use client::ChangeSubscription;
pub use memory::MemoryHub;
pub use sse::SseTransport;
pub use types::{
    ChangeAction, ChangeEvent, ConnectionState, NotifierEvent, SubscriptionConfig,
    TransportEvent,
};

use async_trait::async_trait;
use tokio::sync::mpsc;
use viewcount_common::NotifierError;

/// One way of receiving change events from the record store.
#[async_trait]
pub trait ChangeTransport: Send + Sync {
    /// Open a connection. The first event on a healthy connection is
    /// `TransportEvent::Connect`; the receiver closing means the connection
    /// is gone.
    async fn connect(&self) -> Result<mpsc::Receiver<TransportEvent>, NotifierError>;

    /// Register interest in `topics` for the connection identified by `client_id`.
    async fn subscribe(&self, client_id: &str, topics: &[String]) -> Result<(), NotifierError>;
}
