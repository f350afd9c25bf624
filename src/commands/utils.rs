use anyhow::Result;
use std::path::PathBuf;

use crate::config;

/// Initialize logging
///
/// Logs go to stderr so stdout can carry notifications.
pub fn init_logging(verbose: bool, default_level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let level = if verbose { "debug" } else { default_level };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level)))
        .init();
}

/// Use the explicit config path or fall back to the per-user default
pub fn resolve_config_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => config::default_config_path(),
    }
}
