//! PocketBase realtime over Server-Sent Events.
//!
//! `GET /api/realtime` opens the stream; the first event (`PB_CONNECT`)
//! carries the client id, which is then posted back with the topic list to
//! `POST /api/realtime`. Each change arrives as an event named after its
//! topic with `{ "action": ..., "record": {...} }` as data.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::mpsc;
use tokio_util::io::StreamReader;
use tracing::debug;
use viewcount_common::NotifierError;

use super::types::TransportEvent;
use super::ChangeTransport;

const CONNECT_EVENT: &str = "PB_CONNECT";

// ---------------------------------------------------------------------------
// SSE parsing
// ---------------------------------------------------------------------------

/// A single SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

/// Incremental SSE parser over any buffered reader.
pub(crate) struct SseReader<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> SseReader<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    /// Next complete event, or `None` at end of stream.
    pub(crate) async fn next_event(&mut self) -> std::io::Result<Option<SseEvent>> {
        let mut event: Option<String> = None;
        let mut data = String::new();
        let mut has_data = false;

        while let Some(line) = self.lines.next_line().await? {
            if line.is_empty() {
                // Blank line ends the event.
                if has_data {
                    return Ok(Some(SseEvent { event, data }));
                }
                event = None;
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line.as_str(), ""),
            };
            match field {
                "event" => event = Some(value.to_string()),
                "data" => {
                    if has_data {
                        data.push('\n');
                    }
                    data.push_str(value);
                    has_data = true;
                }
                // id:, retry:
                _ => {}
            }
        }

        if has_data {
            Ok(Some(SseEvent { event, data }))
        } else {
            Ok(None)
        }
    }
}

/// Map a raw SSE event onto a transport event. Nameless events are dropped.
pub(crate) fn translate_event(event: SseEvent) -> Option<TransportEvent> {
    let name = event.event?;
    let data: serde_json::Value = match serde_json::from_str(&event.data) {
        Ok(data) => data,
        Err(e) => {
            return Some(TransportEvent::Error(format!(
                "malformed {name} event: {e}"
            )))
        }
    };

    if name == CONNECT_EVENT {
        return match data.get("clientId").and_then(|v| v.as_str()) {
            Some(client_id) => Some(TransportEvent::Connect {
                client_id: client_id.to_string(),
            }),
            None => Some(TransportEvent::Error(format!(
                "{CONNECT_EVENT} without clientId"
            ))),
        };
    }

    Some(TransportEvent::Message { topic: name, data })
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Realtime change transport for a PocketBase-compatible server.
pub struct SseTransport {
    http: reqwest::Client,
    base_url: String,
}

impl SseTransport {
    pub fn new(base_url: &str, connect_timeout: Duration) -> Result<Self, NotifierError> {
        // No overall timeout: the event stream is long-lived.
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| NotifierError::Connect(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn realtime_url(&self) -> String {
        format!("{}/api/realtime", self.base_url)
    }
}

#[async_trait]
impl ChangeTransport for SseTransport {
    async fn connect(&self) -> Result<mpsc::Receiver<TransportEvent>, NotifierError> {
        let response = self
            .http
            .get(self.realtime_url())
            .header("Accept", "text/event-stream")
            .send()
            .await
            .map_err(|e| NotifierError::Connect(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifierError::Connect(format!("HTTP {status}")));
        }

        let byte_stream = response
            .bytes_stream()
            .map(|result| result.map_err(std::io::Error::other));
        let mut reader = SseReader::new(BufReader::new(StreamReader::new(byte_stream)));

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            loop {
                let event = match reader.next_event().await {
                    Ok(Some(event)) => event,
                    Ok(None) => {
                        debug!("Realtime stream ended");
                        break;
                    }
                    Err(e) => {
                        let _ = tx
                            .send(TransportEvent::Error(
                                NotifierError::Stream(e.to_string()).to_string(),
                            ))
                            .await;
                        break;
                    }
                };
                let Some(event) = translate_event(event) else {
                    continue;
                };
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });

        Ok(rx)
    }

    async fn subscribe(&self, client_id: &str, topics: &[String]) -> Result<(), NotifierError> {
        let body = serde_json::json!({
            "clientId": client_id,
            "subscriptions": topics,
        });
        let response = self
            .http
            .post(self.realtime_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifierError::Subscribe(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(NotifierError::Subscribe(format!("HTTP {status}: {text}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn parse_all(raw: &str) -> Vec<SseEvent> {
        let mut reader = SseReader::new(BufReader::new(raw.as_bytes()));
        let mut events = Vec::new();
        while let Some(event) = reader.next_event().await.unwrap() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn parses_named_events() {
        let raw = "id:abc\nevent:PB_CONNECT\ndata:{\"clientId\":\"abc\"}\n\n\
                   event: viewers\ndata: {\"action\":\"create\"}\n\n";
        let events = parse_all(raw).await;
        assert_eq!(
            events,
            vec![
                SseEvent {
                    event: Some("PB_CONNECT".into()),
                    data: "{\"clientId\":\"abc\"}".into(),
                },
                SseEvent {
                    event: Some("viewers".into()),
                    data: "{\"action\":\"create\"}".into(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn joins_multiline_data_and_skips_comments() {
        let raw = ": keepalive\n\nevent:x\ndata:a\ndata:b\n";
        let events = parse_all(raw).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "a\nb");
    }

    #[test]
    fn connect_event_carries_client_id() {
        let event = SseEvent {
            event: Some("PB_CONNECT".into()),
            data: r#"{"clientId":"c1"}"#.into(),
        };
        assert!(matches!(
            translate_event(event),
            Some(TransportEvent::Connect { client_id }) if client_id == "c1"
        ));
    }

    #[test]
    fn topic_event_becomes_message() {
        let event = SseEvent {
            event: Some("viewers".into()),
            data: r#"{"action":"delete","record":{}}"#.into(),
        };
        match translate_event(event) {
            Some(TransportEvent::Message { topic, data }) => {
                assert_eq!(topic, "viewers");
                assert_eq!(data["action"], "delete");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn nameless_and_malformed_events() {
        let nameless = SseEvent {
            event: None,
            data: "{}".into(),
        };
        assert!(translate_event(nameless).is_none());

        let malformed = SseEvent {
            event: Some("viewers".into()),
            data: "not json".into(),
        };
        assert!(matches!(
            translate_event(malformed),
            Some(TransportEvent::Error(_))
        ));
    }
}
