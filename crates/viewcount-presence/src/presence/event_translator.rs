//! Background task that turns `NotifierEvent`s into count refreshes.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::notifier::NotifierEvent;

use super::aggregator::CountAggregator;

/// Consume subscription events until the subscription closes.
///
/// A (re)connect triggers a refetch, since changes missed while disconnected
/// are never replayed.
pub(crate) async fn change_listener(
    mut events: mpsc::Receiver<NotifierEvent>,
    aggregator: Arc<CountAggregator>,
) {
    while let Some(event) = events.recv().await {
        match event {
            NotifierEvent::Connected { client_id } => {
                debug!(client_id = %client_id, url = %aggregator.url(), "Live updates active");
                let _ = aggregator.fetch_viewer_count().await;
            }
            NotifierEvent::Change(change) => {
                aggregator.handle_change(&change).await;
            }
            NotifierEvent::Disconnected => {
                debug!(url = %aggregator.url(), "Live updates paused");
            }
            NotifierEvent::Error(message) => {
                debug!(error = %message, "Live update error");
            }
        }
    }
}
