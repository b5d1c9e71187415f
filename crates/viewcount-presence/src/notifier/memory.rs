//! In-process change transport.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::debug;
use viewcount_common::{new_client_id, NotifierError};

use super::handler::change_payload;
use super::types::{ChangeEvent, TransportEvent};
use super::ChangeTransport;

const HUB_CAPACITY: usize = 256;

struct HubInner {
    events: broadcast::Sender<ChangeEvent>,
    /// Live connections and the topics each one subscribed to.
    clients: Mutex<HashMap<String, Vec<String>>>,
    accepting: AtomicBool,
    /// Bumped to force every live connection closed.
    generation: watch::Sender<u64>,
}

impl HubInner {
    fn clients(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<String>>> {
        self.clients.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_subscribed(&self, client_id: &str, topic: &str) -> bool {
        self.clients()
            .get(client_id)
            .is_some_and(|topics| topics.iter().any(|t| t == topic))
    }
}

/// Broadcast fan-out of change events to in-process subscribers.
///
/// Cloning yields another handle to the same hub.
#[derive(Clone)]
pub struct MemoryHub {
    inner: Arc<HubInner>,
}

impl Default for MemoryHub {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHub {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(HUB_CAPACITY);
        let (generation, _) = watch::channel(0);
        Self {
            inner: Arc::new(HubInner {
                events,
                clients: Mutex::new(HashMap::new()),
                accepting: AtomicBool::new(true),
                generation,
            }),
        }
    }

    /// Publish a change. Returns how many connections received it.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        self.inner.events.send(event).unwrap_or(0)
    }

    /// Every published change, unfiltered.
    pub fn raw_events(&self) -> broadcast::Receiver<ChangeEvent> {
        self.inner.events.subscribe()
    }

    /// While not accepting, `connect` fails.
    pub fn set_accepting(&self, accepting: bool) {
        self.inner.accepting.store(accepting, Ordering::SeqCst);
    }

    /// Close every live connection, as a server restart would.
    pub fn drop_connections(&self) {
        self.inner.generation.send_modify(|g| *g += 1);
    }

    pub fn connection_count(&self) -> usize {
        self.inner.clients().len()
    }
}

#[async_trait]
impl ChangeTransport for MemoryHub {
    async fn connect(&self) -> Result<mpsc::Receiver<TransportEvent>, NotifierError> {
        if !self.inner.accepting.load(Ordering::SeqCst) {
            return Err(NotifierError::Connect("hub is not accepting connections".into()));
        }

        let client_id = new_client_id();
        let (tx, rx) = mpsc::channel(64);
        let mut events = self.inner.events.subscribe();
        let mut generation = self.inner.generation.subscribe();

        self.inner.clients().insert(client_id.clone(), Vec::new());
        tx.send(TransportEvent::Connect {
            client_id: client_id.clone(),
        })
        .await
        .map_err(|e| NotifierError::Connect(e.to_string()))?;

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    received = events.recv() => match received {
                        Ok(event) => {
                            if !inner.is_subscribed(&client_id, &event.topic) {
                                continue;
                            }
                            let message = TransportEvent::Message {
                                topic: event.topic.clone(),
                                data: change_payload(&event),
                            };
                            if tx.send(message).await.is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            let _ = tx
                                .send(TransportEvent::Error(format!("lagged, {skipped} changes skipped")))
                                .await;
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = generation.changed() => break,
                    _ = tx.closed() => break,
                }
            }
            inner.clients().remove(&client_id);
            debug!(client_id = %client_id, "Hub connection closed");
        });

        Ok(rx)
    }

    async fn subscribe(&self, client_id: &str, topics: &[String]) -> Result<(), NotifierError> {
        let mut clients = self.inner.clients();
        let subscribed = clients
            .get_mut(client_id)
            .ok_or_else(|| NotifierError::Subscribe(format!("unknown client {client_id}")))?;
        *subscribed = topics.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::ChangeAction;
    use crate::store::PresenceRecord;
    use chrono::Utc;
    use viewcount_common::RecordId;

    fn change(topic: &str, url: &str) -> ChangeEvent {
        ChangeEvent {
            topic: topic.into(),
            action: ChangeAction::Create,
            record: PresenceRecord {
                id: RecordId::new(),
                url: url.into(),
                session_id: "s1".into(),
                updated_at: Utc::now(),
            },
        }
    }

    async fn connected(hub: &MemoryHub, topics: &[&str]) -> mpsc::Receiver<TransportEvent> {
        let mut rx = hub.connect().await.unwrap();
        let Some(TransportEvent::Connect { client_id }) = rx.recv().await else {
            panic!("expected connect event");
        };
        let topics: Vec<String> = topics.iter().map(|t| t.to_string()).collect();
        hub.subscribe(&client_id, &topics).await.unwrap();
        rx
    }

    #[tokio::test]
    async fn delivers_only_subscribed_topics() {
        let hub = MemoryHub::new();
        let mut rx = connected(&hub, &["viewers"]).await;

        hub.publish(change("other", "https://x/a"));
        hub.publish(change("viewers", "https://x/b"));

        match rx.recv().await {
            Some(TransportEvent::Message { topic, data }) => {
                assert_eq!(topic, "viewers");
                assert_eq!(data["record"]["url"], "https://x/b");
                assert_eq!(data["action"], "create");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn refuses_connections_when_closed() {
        let hub = MemoryHub::new();
        hub.set_accepting(false);
        assert!(matches!(
            hub.connect().await,
            Err(NotifierError::Connect(_))
        ));
    }

    #[tokio::test]
    async fn subscribe_requires_known_client() {
        let hub = MemoryHub::new();
        let err = hub
            .subscribe("nobody", &["viewers".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, NotifierError::Subscribe(_)));
    }

    #[tokio::test]
    async fn drop_connections_ends_streams() {
        let hub = MemoryHub::new();
        let mut rx = connected(&hub, &["viewers"]).await;
        assert_eq!(hub.connection_count(), 1);

        hub.drop_connections();
        assert!(rx.recv().await.is_none());
        assert_eq!(hub.connection_count(), 0);
    }
}
