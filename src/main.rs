use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod config;
mod fs_util;
mod host;
mod watcher;

use cli::{Args, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Some(Commands::Bridge { api_base_url, timeout_secs }) => {
            commands::bridge(args.config, api_base_url, timeout_secs, args.verbose)
        }
        Some(Commands::Watch) => commands::watch(args.config, args.verbose),
        Some(Commands::Check) => commands::check(args.config, args.verbose),
        Some(Commands::Init { api_key, token, lists, force, skip_check }) => {
            commands::init(args.config, api_key, token, lists, force, skip_check, args.verbose)
        }
        // No subcommand: act as the host bridge
        None => commands::bridge(
            args.config,
            watcher::DEFAULT_API_BASE_URL.to_string(),
            watcher::DEFAULT_TIMEOUT_SECS,
            args.verbose,
        ),
    }
}
