use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Trello Watcher
///
/// Polls Trello lists every 15 seconds and raises an alarm when a new card
/// appears. Divider and placeholder cards are ignored.
#[derive(Parser, Debug)]
#[command(name = "trello-watcher")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file (defaults to the per-user config directory; not accepted by bridge)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Drive the engine with JSON commands on stdin, notifications on stdout
    Bridge {
        /// Trello API root
        #[arg(long, default_value = crate::watcher::DEFAULT_API_BASE_URL)]
        api_base_url: String,

        /// Per-request timeout in seconds
        #[arg(long, default_value_t = crate::watcher::DEFAULT_TIMEOUT_SECS)]
        timeout_secs: u64,
    },
    /// Watch the configured lists until interrupted
    Watch,
    /// Fetch every configured list once and print the counts
    Check,
    /// Write a configuration file
    Init {
        /// Trello API key
        #[arg(long)]
        api_key: String,

        /// Trello API token
        #[arg(long)]
        token: String,

        /// List to watch, as ID=NAME (repeatable)
        #[arg(long = "list", value_name = "ID=NAME", required = true)]
        lists: Vec<String>,

        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,

        /// Don't test the credentials against Trello before saving
        #[arg(long)]
        skip_check: bool,
    },
}
