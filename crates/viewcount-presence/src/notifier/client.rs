//! Public handle for a live change subscription.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::connection::connection_loop;
use super::types::{ConnectionState, NotifierEvent, SubscriptionConfig};
use super::ChangeTransport;

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// Handle for a background change subscription.
///
/// The connection task reconnects on its own; dropping the handle stops it.
pub struct ChangeSubscription {
    state: watch::Receiver<ConnectionState>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ChangeSubscription {
    /// Start the background connection.
    /// Returns `(subscription, event_receiver)`.
    pub fn open(
        transport: Arc<dyn ChangeTransport>,
        config: SubscriptionConfig,
    ) -> (Self, mpsc::Receiver<NotifierEvent>) {
        let (event_tx, event_rx) = mpsc::channel(256);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(connection_loop(
            transport,
            config,
            state_tx,
            event_tx,
            shutdown_rx,
        ));

        let subscription = Self {
            state: state_rx,
            shutdown: shutdown_tx,
            task,
        };
        (subscription, event_rx)
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Watch state transitions.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Ask the connection task to stop. It settles in `Disconnected`.
    pub fn close(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for ChangeSubscription {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
        self.task.abort();
    }
}
