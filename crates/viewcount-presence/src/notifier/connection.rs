//! Background connection loop with fixed-delay reconnect.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use super::handler::parse_change;
use super::types::{ConnectionState, NotifierEvent, SubscriptionConfig, TransportEvent};
use super::ChangeTransport;

/// Why one connection ended.
enum SessionEnd {
    Dropped,
    Shutdown,
}

// ---------------------------------------------------------------------------
// Connection Loop
// ---------------------------------------------------------------------------

/// Background task driving the reconnect state machine until shutdown.
pub(crate) async fn connection_loop(
    transport: Arc<dyn ChangeTransport>,
    config: SubscriptionConfig,
    state: watch::Sender<ConnectionState>,
    event_tx: mpsc::Sender<NotifierEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() || event_tx.is_closed() {
            break;
        }

        state.send_replace(ConnectionState::Connecting);
        debug!(topics = ?config.topics, "Connecting change subscription");

        let attempt = tokio::select! {
            result = tokio::time::timeout(config.connect_timeout, transport.connect()) => result,
            _ = shutdown.changed() => break,
        };

        match attempt {
            Ok(Ok(events)) => {
                let end = run_connection(
                    transport.as_ref(),
                    &config,
                    &state,
                    &event_tx,
                    events,
                    &mut shutdown,
                )
                .await;
                let was_connected = state.send_replace(ConnectionState::Disconnected)
                    == ConnectionState::Connected;
                if let SessionEnd::Shutdown = end {
                    break;
                }
                if was_connected {
                    info!("Change subscription lost");
                    let _ = event_tx.send(NotifierEvent::Disconnected).await;
                }
            }
            Ok(Err(e)) => {
                state.send_replace(ConnectionState::Disconnected);
                error!(error = %e, "Failed to open change subscription");
                let _ = event_tx
                    .send(NotifierEvent::Error(format!("Connection failed: {e}")))
                    .await;
            }
            Err(_elapsed) => {
                state.send_replace(ConnectionState::Disconnected);
                error!(
                    timeout_ms = config.connect_timeout.as_millis() as u64,
                    "Change subscription connect timed out"
                );
                let _ = event_tx
                    .send(NotifierEvent::Error("Connection timed out".to_string()))
                    .await;
            }
        }

        // Fixed-delay reconnect, unbounded retries.
        info!(
            delay_ms = config.reconnect_delay.as_millis() as u64,
            "Reconnecting change subscription"
        );
        tokio::select! {
            _ = tokio::time::sleep(config.reconnect_delay) => {}
            _ = shutdown.changed() => break,
        }
    }

    state.send_replace(ConnectionState::Disconnected);
    debug!("Change subscription closed");
}

/// Pump one connection's events until it ends or shutdown is signalled.
async fn run_connection(
    transport: &dyn ChangeTransport,
    config: &SubscriptionConfig,
    state: &watch::Sender<ConnectionState>,
    event_tx: &mpsc::Sender<NotifierEvent>,
    mut events: mpsc::Receiver<TransportEvent>,
    shutdown: &mut watch::Receiver<bool>,
) -> SessionEnd {
    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = shutdown.changed() => return SessionEnd::Shutdown,
        };
        let Some(event) = event else {
            return SessionEnd::Dropped;
        };

        match event {
            TransportEvent::Connect { client_id } => {
                if let Err(e) = transport.subscribe(&client_id, &config.topics).await {
                    warn!(error = %e, client_id = %client_id, "Topic subscription failed");
                    let _ = event_tx.send(NotifierEvent::Error(e.to_string())).await;
                    return SessionEnd::Dropped;
                }
                state.send_replace(ConnectionState::Connected);
                info!(client_id = %client_id, "Change subscription connected");
                if event_tx
                    .send(NotifierEvent::Connected { client_id })
                    .await
                    .is_err()
                {
                    return SessionEnd::Shutdown;
                }
            }
            TransportEvent::Message { topic, data } => {
                if !config.topics.iter().any(|t| t == &topic) {
                    continue;
                }
                match parse_change(&topic, &data) {
                    Ok(change) => {
                        if event_tx.send(NotifierEvent::Change(change)).await.is_err() {
                            return SessionEnd::Shutdown;
                        }
                    }
                    Err(e) => debug!(topic = %topic, error = %e, "Ignoring malformed change"),
                }
            }
            TransportEvent::Error(message) => {
                warn!(error = %message, "Change transport error");
                let _ = event_tx.send(NotifierEvent::Error(message)).await;
            }
        }
    }
}
