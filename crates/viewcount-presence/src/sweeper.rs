//! Periodic eviction of presence records that stopped renewing.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use viewcount_common::PresenceError;

use crate::clock::{to_chrono, SharedClock};
use crate::cron::CronTrigger;
use crate::store::PresenceStore;

/// Result of one sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepOutcome {
    pub cutoff: DateTime<Utc>,
    pub removed: usize,
    /// Stale records left for a later sweep by the batch limit.
    pub deferred: usize,
}

impl SweepOutcome {
    fn empty(cutoff: DateTime<Utc>) -> Self {
        Self {
            cutoff,
            removed: 0,
            deferred: 0,
        }
    }
}

/// Deletes records last renewed before `now - stale_threshold`, in one
/// atomic batch per run.
///
/// With a batch limit, each run deletes the oldest `max_batch` stale records
/// and a backlog drains over several runs.
pub struct Sweeper {
    store: Arc<dyn PresenceStore>,
    clock: SharedClock,
    stale_threshold: Duration,
    max_batch: Option<usize>,
}

impl Sweeper {
    pub fn new(store: Arc<dyn PresenceStore>, clock: SharedClock, stale_threshold: Duration) -> Self {
        Self {
            store,
            clock,
            stale_threshold,
            max_batch: None,
        }
    }

    pub fn with_max_batch(mut self, max_batch: usize) -> Self {
        self.max_batch = Some(max_batch.max(1));
        self
    }

    /// Run one sweep.
    ///
    /// A missing collection means nothing has registered yet and counts as an
    /// empty sweep.
    pub async fn sweep_once(&self) -> Result<SweepOutcome, PresenceError> {
        let cutoff = self.clock.now() - to_chrono(self.stale_threshold);

        let mut stale = match self.store.filter_by_threshold(None, cutoff).await {
            Ok(stale) => stale,
            Err(e) if e.is_collection_missing() => {
                debug!("Presence collection not ready, nothing to sweep");
                return Ok(SweepOutcome::empty(cutoff));
            }
            Err(e) => return Err(e.into()),
        };

        if stale.is_empty() {
            return Ok(SweepOutcome::empty(cutoff));
        }

        let mut deferred = 0;
        if let Some(limit) = self.max_batch.filter(|&limit| stale.len() > limit) {
            stale.sort_by_key(|r| r.updated_at);
            deferred = stale.len() - limit;
            stale.truncate(limit);
            debug!(deferred, limit, "Stale backlog exceeds batch limit");
        }

        self.store
            .delete_all(&stale)
            .await
            .map_err(|e| PresenceError::SweepFailed(e.to_string()))?;
        info!("Removed {} stale viewer sessions", stale.len());

        Ok(SweepOutcome {
            cutoff,
            removed: stale.len(),
            deferred,
        })
    }

    /// One scheduled run. Failures are logged and left for the next tick.
    pub async fn tick(&self) -> Option<SweepOutcome> {
        match self.sweep_once().await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!(error = %e, "Sweep failed");
                None
            }
        }
    }

    /// Run on `trigger` until the handle is aborted.
    pub fn spawn(self: Arc<Self>, trigger: CronTrigger) -> JoinHandle<()> {
        trigger.spawn(move || {
            let sweeper = Arc::clone(&self);
            async move {
                sweeper.tick().await;
            }
        })
    }
}
