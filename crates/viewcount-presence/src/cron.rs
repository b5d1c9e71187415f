//! Fixed-cadence job trigger.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

/// Fires a job every `period`, first after one full period.
///
/// Ticks missed while a run overran are skipped, not caught up.
#[derive(Debug, Clone)]
pub struct CronTrigger {
    name: String,
    period: Duration,
}

impl CronTrigger {
    pub fn every(name: &str, period: Duration) -> Self {
        Self {
            name: name.to_string(),
            period,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Run `job` on this schedule until the returned handle is aborted.
    pub fn spawn<F, Fut>(self, mut job: F) -> JoinHandle<()>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + self.period, self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                debug!(job = %self.name, "Cron tick");
                job().await;
            }
        })
    }
}
