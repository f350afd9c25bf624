use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::{WatcherConfig, parse_target};

use super::utils::{init_logging, resolve_config_path};
use super::watch::check_once;

/// Write a configuration file, optionally testing the credentials first
pub fn init(
    config_path: Option<PathBuf>,
    api_key: String,
    token: String,
    lists: Vec<String>,
    force: bool,
    skip_check: bool,
    verbose: bool,
) -> Result<()> {
    init_logging(verbose, "info");

    let config_path = resolve_config_path(config_path)?;
    let config = build_config(api_key, token, &lists)?;
    ensure_writable(&config_path, force)?;

    println!("Trello Watcher - Setup");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!();

    if !skip_check {
        println!("Testing connection to Trello...");

        let runtime = tokio::runtime::Runtime::new()?;
        let buckets = runtime
            .block_on(check_once(&config))
            .context("Failed to fetch lists from Trello")?;

        println!("✓ Credentials accepted ({} of {} lists reachable)", buckets.len(), config.targets.len());
    }

    config.save(&config_path)?;
    println!("✓ Configuration saved to: {}", config_path.display());

    println!();
    println!("Next steps:");
    println!("  trello-watcher watch");
    println!();
    println!("Lists are checked every {} seconds.", crate::watcher::POLL_INTERVAL.as_secs());

    Ok(())
}

fn build_config(api_key: String, token: String, lists: &[String]) -> Result<WatcherConfig> {
    let targets = lists
        .iter()
        .map(|spec| parse_target(spec))
        .collect::<Result<Vec<_>>>()?;

    let config = WatcherConfig::new(api_key, token, targets);
    config.validate().context("Invalid configuration")?;

    Ok(config)
}

fn ensure_writable(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Configuration already exists at {} (use --force to overwrite)",
            path.display()
        );
    }
    Ok(())
}
