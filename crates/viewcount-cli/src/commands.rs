//! Subcommand implementations.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use viewcount_common::PresenceError;
use viewcount_config::validation::require_store_url;
use viewcount_config::{config_to_json, ViewcountConfig};
use viewcount_presence::{
    attach_renderer, session_id, CronTrigger, FileSessionStorage, HttpStore, LogRenderer,
    MemorySessionStorage, PageUrl, SessionStorage, SseTransport, Sweeper, SystemClock,
    TrackerConfig, ViewerTracker,
};

const REALTIME_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Map configuration onto tracker settings.
pub fn tracker_config(config: &ViewcountConfig) -> TrackerConfig {
    TrackerConfig {
        heartbeat_interval: config.presence.heartbeat_interval(),
        stale_threshold: config.presence.stale_threshold(),
        reconnect_delay: config.presence.reconnect_delay(),
        live_filter: config.presence.live_filter,
    }
}

fn http_store(config: &ViewcountConfig) -> Result<Arc<HttpStore>, PresenceError> {
    require_store_url(config)?;
    let store = HttpStore::new(
        config.store.base_url(),
        &config.store.collection,
        config.store.request_timeout(),
    )?;
    Ok(Arc::new(store))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for ctrl-c");
    }
}

/// Track one page until interrupted.
pub async fn watch(
    config: &ViewcountConfig,
    url: &str,
    session_file: Option<PathBuf>,
) -> Result<(), PresenceError> {
    let page_url = PageUrl::parse(url)?;
    let store = http_store(config)?;
    let transport = Arc::new(SseTransport::new(
        config.store.base_url(),
        REALTIME_CONNECT_TIMEOUT,
    )?);

    let storage: Box<dyn SessionStorage> =
        match session_file.or_else(|| config.presence.session_file.clone()) {
            Some(path) => Box::new(FileSessionStorage::new(path)),
            None => Box::new(MemorySessionStorage::new()),
        };
    let session = session_id(storage.as_ref());

    let tracker = ViewerTracker::new(
        &page_url,
        &session,
        store,
        transport,
        Arc::new(SystemClock),
        tracker_config(config),
    );
    attach_renderer(&tracker, Arc::new(LogRenderer::new(page_url.as_str())));
    tracker.start().await;

    shutdown_signal().await;
    tracker.stop();
    info!(url = %page_url, "Stopped watching");
    Ok(())
}

/// Run the eviction sweeper, once or on its cron cadence.
pub async fn sweep(config: &ViewcountConfig, once: bool) -> Result<(), PresenceError> {
    let store = http_store(config)?;
    let sweeper = Arc::new(
        Sweeper::new(
            store,
            Arc::new(SystemClock),
            config.presence.stale_threshold(),
        )
        .with_max_batch(config.sweeper.max_batch as usize),
    );

    if once {
        let outcome = sweeper.sweep_once().await?;
        info!(
            removed = outcome.removed,
            deferred = outcome.deferred,
            cutoff = %outcome.cutoff,
            "Sweep complete"
        );
        return Ok(());
    }

    if !config.sweeper.enabled {
        warn!("Sweeper is disabled in config; use --once to force a run");
        return Ok(());
    }

    let handle = sweeper.spawn(CronTrigger::every("sweep", config.sweeper.interval()));
    info!(interval_secs = config.sweeper.interval_secs, "Sweeper running");
    shutdown_signal().await;
    handle.abort();
    info!("Sweeper stopped");
    Ok(())
}

/// Print the effective configuration.
pub fn show_config(config: &ViewcountConfig) {
    println!("{}", config_to_json(config));
}
