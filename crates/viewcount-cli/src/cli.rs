use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// viewcount: live "who is viewing this page" presence.
#[derive(Parser, Debug)]
#[command(name = "viewcount", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Register as a viewer of a page and log its live viewer count.
    Watch {
        /// Page URL to watch.
        #[arg(long)]
        url: String,

        /// File persisting the session token across restarts.
        #[arg(long)]
        session_file: Option<PathBuf>,
    },
    /// Evict stale viewer sessions on the configured cadence.
    Sweep {
        /// Run a single sweep and exit.
        #[arg(long)]
        once: bool,
    },
    /// Print the effective configuration as JSON.
    Config,
}

pub fn parse() -> Args {
    Args::parse()
}
