use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

use crate::host::run_stdio_bridge;
use crate::watcher::EngineSettings;

use super::utils::init_logging;

/// Run the stdio host bridge until stdin closes
///
/// Credentials and targets arrive with the host's `start` command, so the
/// bridge never reads a config file. Passing `--config` is an error rather
/// than being silently dropped.
pub fn bridge(
    config: Option<PathBuf>,
    api_base_url: String,
    timeout_secs: u64,
    verbose: bool,
) -> Result<()> {
    let settings = bridge_settings(config, api_base_url, timeout_secs)?;

    init_logging(verbose, "info");
    tracing::info!("trello-watcher bridge starting");

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_stdio_bridge(settings))?;

    tracing::info!("trello-watcher bridge shut down cleanly");
    Ok(())
}

fn bridge_settings(
    config: Option<PathBuf>,
    api_base_url: String,
    timeout_secs: u64,
) -> Result<EngineSettings> {
    if let Some(path) = config {
        anyhow::bail!(
            "The bridge takes credentials from the host and does not read a config file ({}); \
             use --api-base-url and --timeout-secs instead",
            path.display()
        );
    }

    if timeout_secs == 0 {
        anyhow::bail!("Timeout must be at least 1 second");
    }

    Ok(EngineSettings {
        api_base_url,
        fetch_timeout: Duration::from_secs(timeout_secs),
        ..Default::default()
    })
}
