//! viewcount: live per-page viewer counts over a PocketBase-style store.
//!
//! `watch` registers this process as a viewer of a page and logs the page's
//! live count as it changes. `sweep` runs the stale-session eviction job.

mod cli;
mod commands;

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;
use viewcount_config::schema::ViewcountConfig;

use crate::cli::Command;

fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("viewcount={level}"))),
        )
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();

    let loaded = match &args.config {
        Some(path) => viewcount_config::load_config_from(path),
        None => viewcount_config::load_config(),
    };

    let level = args
        .log_level
        .clone()
        .or_else(|| {
            loaded
                .as_ref()
                .ok()
                .map(|c| c.logging.level.as_directive().to_string())
        })
        .unwrap_or_else(|| "info".to_string());
    init_logging(&level);

    tracing::info!("viewcount v{} starting", env!("CARGO_PKG_VERSION"));

    let config = loaded.unwrap_or_else(|e| {
        tracing::warn!("Config load failed, using defaults: {e}");
        let mut config = ViewcountConfig::default();
        viewcount_config::toml_loader::apply_env_overrides(&mut config);
        config
    });

    let result = match args.command {
        Command::Watch { url, session_file } => {
            commands::watch(&config, &url, session_file).await
        }
        Command::Sweep { once } => commands::sweep(&config, once).await,
        Command::Config => {
            commands::show_config(&config);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
