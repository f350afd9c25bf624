use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::fs_util;
use crate::watcher::{
    Credentials, DEFAULT_API_BASE_URL, DEFAULT_FAILURE_WARN_THRESHOLD, DEFAULT_TIMEOUT_SECS,
    EngineSettings, Target,
};

/// Watcher configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatcherConfig {
    pub trello: TrelloConfig,

    #[serde(default)]
    pub targets: Vec<Target>,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub watcher: WatcherSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Trello API access
#[derive(Clone, Deserialize, Serialize)]
pub struct TrelloConfig {
    /// Create at: https://trello.com/power-ups/admin
    pub api_key: String,

    pub token: String,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

impl std::fmt::Debug for TrelloConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrelloConfig")
            .field("api_key", &"<redacted>")
            .field("token", &"<redacted>")
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

/// HTTP client settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    /// Per-fetch timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Poll engine settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatcherSettings {
    /// Consecutive failures of one list before a warning is logged
    #[serde(default = "default_failure_warn_threshold")]
    pub failure_warn_threshold: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values
fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_failure_warn_threshold() -> u32 {
    DEFAULT_FAILURE_WARN_THRESHOLD
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            failure_warn_threshold: default_failure_warn_threshold(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl WatcherConfig {
    /// Build a configuration for the public Trello API
    pub fn new(api_key: String, token: String, targets: Vec<Target>) -> Self {
        Self {
            trello: TrelloConfig {
                api_key,
                token,
                api_base_url: default_api_base_url(),
            },
            targets,
            http: HttpConfig::default(),
            watcher: WatcherSettings::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: WatcherConfig = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let toml = toml::to_string_pretty(self).context("Failed to serialize config")?;

        // Holds the API token
        fs_util::atomic_write(path, toml.as_bytes(), 0o600)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.trello.api_base_url).context("Invalid Trello API URL")?;

        if url.cannot_be_a_base() {
            anyhow::bail!("Trello API URL cannot be used as a base: {}", url);
        }

        // Plain HTTP is only acceptable against a local stub
        let is_loopback = match url.host() {
            Some(url::Host::Domain(domain)) => domain == "localhost",
            Some(url::Host::Ipv4(addr)) => addr.is_loopback(),
            Some(url::Host::Ipv6(addr)) => addr.is_loopback(),
            None => false,
        };
        if url.scheme() != "https" && !(url.scheme() == "http" && is_loopback) {
            anyhow::bail!("Trello API URL must use HTTPS (got: {})", url.scheme());
        }

        if self.trello.api_key.trim().is_empty() {
            anyhow::bail!("Trello API key is empty");
        }

        if self.trello.token.trim().is_empty() {
            anyhow::bail!("Trello token is empty");
        }

        if self.targets.is_empty() {
            anyhow::bail!("At least one list must be configured under [[targets]]");
        }

        let mut seen = HashSet::new();
        for target in &self.targets {
            if target.id.trim().is_empty() {
                anyhow::bail!("List '{}' has an empty id", target.name);
            }
            if !seen.insert(target.id.as_str()) {
                anyhow::bail!("List id '{}' is configured more than once", target.id);
            }
        }

        if self.http.timeout_secs == 0 {
            anyhow::bail!("HTTP timeout must be at least 1 second");
        }

        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            api_key: self.trello.api_key.clone(),
            token: self.trello.token.clone(),
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            api_base_url: self.trello.api_base_url.clone(),
            fetch_timeout: Duration::from_secs(self.http.timeout_secs),
            failure_warn_threshold: self.watcher.failure_warn_threshold,
        }
    }
}

/// Get the per-user config file path
pub fn default_config_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "trello-watcher")
        .context("Could not determine a home directory for the config file")?;
    Ok(dirs.config_dir().join("config.toml"))
}

/// Parse a `ID=NAME` list specification
pub fn parse_target(spec: &str) -> Result<Target> {
    let (id, name) = spec
        .split_once('=')
        .with_context(|| format!("Expected ID=NAME, got: {}", spec))?;

    let id = id.trim();
    let name = name.trim();
    if id.is_empty() || name.is_empty() {
        anyhow::bail!("Expected ID=NAME with both parts non-empty, got: {}", spec);
    }

    Ok(Target {
        id: id.to_string(),
        name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"
[trello]
api_key = "key123"
token = "tok456"

[[targets]]
id = "5f1a"
name = "Inbox"

[[targets]]
id = "5f1b"
name = "Escalations"
"#;

    fn sample() -> WatcherConfig {
        WatcherConfig::from_toml_str(SAMPLE).unwrap()
    }

    #[test]
    fn parses_minimal_config_with_defaults() {
        let config = sample();
        assert_eq!(config.trello.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.http.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.watcher.failure_warn_threshold, DEFAULT_FAILURE_WARN_THRESHOLD);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.targets.len(), 2);
        assert_eq!(config.targets[1].name, "Escalations");
    }

    #[test]
    fn engine_settings_follow_config() {
        let mut config = sample();
        config.http.timeout_secs = 7;
        config.watcher.failure_warn_threshold = 2;

        let settings = config.engine_settings();
        assert_eq!(settings.fetch_timeout, Duration::from_secs(7));
        assert_eq!(settings.failure_warn_threshold, 2);
        assert_eq!(settings.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn rejects_plain_http_for_remote_hosts() {
        let mut config = sample();
        config.trello.api_base_url = "http://api.trello.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn accepts_plain_http_for_loopback() {
        let mut config = sample();
        for url in ["http://localhost:8080", "http://127.0.0.1:9000", "http://[::1]:9000"] {
            config.trello.api_base_url = url.to_string();
            assert!(config.validate().is_ok(), "{} should be accepted", url);
        }
    }

    #[test]
    fn rejects_empty_credentials() {
        let mut config = sample();
        config.trello.token = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = sample();
        config.trello.api_key = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_missing_or_duplicate_targets() {
        let mut config = sample();
        config.targets.clear();
        assert!(config.validate().is_err());

        let mut config = sample();
        config.targets[1].id = config.targets[0].id.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_timeout() {
        let mut config = sample();
        config.http.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn save_then_load_preserves_targets() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = sample();
        config.save(&path).unwrap();
        let loaded = WatcherConfig::load(&path).unwrap();

        assert_eq!(loaded.targets, config.targets);
        assert_eq!(loaded.credentials(), config.credentials());
    }

    #[cfg(unix)]
    #[test]
    fn save_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        sample().save(&path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempdir().unwrap();
        assert!(WatcherConfig::load(&dir.path().join("absent.toml")).is_err());
    }

    #[test]
    fn debug_output_redacts_credentials() {
        let debug = format!("{:?}", sample());
        assert!(!debug.contains("key123"));
        assert!(!debug.contains("tok456"));
    }

    #[test]
    fn parse_target_splits_on_first_equals() {
        let target = parse_target("5f1a=Support = Tier 1").unwrap();
        assert_eq!(target.id, "5f1a");
        assert_eq!(target.name, "Support = Tier 1");

        assert!(parse_target("no-separator").is_err());
        assert!(parse_target("=Name").is_err());
        assert!(parse_target("id=").is_err());
    }
}
